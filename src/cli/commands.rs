use crate::config::{NodeConfig, DEFAULT_NODE_ADDR};
use crate::error::Result;
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "gossip-chain")]
pub struct Opt {
    #[arg(
        long = "log-level",
        global = true,
        default_value = "info",
        help = "Log level (error, warn, info, debug, trace)"
    )]
    pub log_level: LevelFilter,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(name = "startnode", about = "Start a node and serve until killed")]
    StartNode(NodeArgs),
    #[command(name = "keygen", about = "Generate a new signing key")]
    Keygen,
    #[command(name = "sendtx", about = "Sign a demo transaction and submit it to a node")]
    SendTx {
        #[arg(long, default_value = DEFAULT_NODE_ADDR, help = "Node to submit to")]
        node: String,
        #[arg(long, help = "Amount to send")]
        amount: u64,
        #[arg(long, help = "Destination address (hex); defaults to the sender")]
        to: Option<String>,
        #[arg(long, help = "Sender seed (hex); a fresh key is used when omitted")]
        seed: Option<String>,
    },
}

/// Node settings from the command line. Flags override the config file.
#[derive(Args, Debug, Default)]
pub struct NodeArgs {
    #[arg(long, help = "TOML config file")]
    pub config: Option<PathBuf>,
    #[arg(long, help = "Listen address, e.g. 127.0.0.1:3000")]
    pub listen: Option<String>,
    #[arg(
        long,
        value_delimiter = ',',
        help = "Comma-separated addresses to bootstrap from"
    )]
    pub bootstrap: Vec<String>,
    #[arg(long, help = "Validator seed (hex); enables the validator tick")]
    pub seed: Option<String>,
    #[arg(long = "produce-blocks", help = "Seal pending transactions into blocks")]
    pub produce_blocks: bool,
    #[arg(long = "store-path", help = "Persist blocks in a sled database here")]
    pub store_path: Option<PathBuf>,
}

impl NodeArgs {
    /// File, then `NODE_ADDRESS`, then flags
    pub fn into_config(self) -> Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::from_file(path)?,
            None => NodeConfig::default(),
        }
        .with_env_overrides();

        if let Some(listen) = self.listen {
            config.listen_addr = listen;
        }
        if !self.bootstrap.is_empty() {
            config.bootstrap_nodes = self.bootstrap;
        }
        if self.seed.is_some() {
            config.private_key = self.seed;
        }
        if self.produce_blocks {
            config.block_production = true;
        }
        if self.store_path.is_some() {
            config.store_path = self.store_path;
        }

        config.validate()?;
        Ok(config)
    }
}
