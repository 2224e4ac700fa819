// Entry point for the gossip-chain node binary
use clap::Parser;
use data_encoding::HEXLOWER;
use gossip_chain::network::send_tx;
use gossip_chain::{
    current_timestamp, sha256_digest, Address, Command, Node, NodeConfig, Opt, PrivateKey, Server,
    Transaction, TxInput, TxOutput,
};
use log::error;
use std::process;

fn main() {
    let opt = Opt::parse();

    // RUST_LOG still wins when set, --log-level is the fallback
    env_logger::Builder::new()
        .filter_level(opt.log_level)
        .parse_default_env()
        .init();

    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::StartNode(args) => {
            let config = args.into_config()?;
            let node = Node::from_config(config)?;
            if node.is_validator() {
                println!(
                    "Validator on, mode {:?}, every {:?}",
                    node.validator_mode(),
                    node.config().block_time()
                );
            }
            Server::bind(node)?
                .run()
                .map_err(|e| format!("Server error: {e}"))?
        }
        Command::Keygen => {
            let key = PrivateKey::generate()?;
            println!("Seed:       {}", key.seed_hex());
            println!("Public key: {}", key.public());
            println!("Address:    {}", key.public().address());
        }
        Command::SendTx {
            node,
            amount,
            to,
            seed,
        } => {
            if amount == 0 {
                return Err("Amount must be positive".into());
            }
            let key = match seed {
                Some(seed) => PrivateKey::from_hex(&seed)?,
                None => PrivateKey::generate()?,
            };
            let to = match to {
                Some(to) => Address::from_hex(&to)?,
                None => key.public().address(),
            };

            // There is no UTXO set to spend from, so the input points at a
            // fresh pseudo-outpoint
            let outpoint = sha256_digest(&current_timestamp()?.to_be_bytes());
            let mut tx = Transaction::new(
                1,
                vec![TxInput::new(&outpoint, 0, &key.public())],
                vec![TxOutput::new(amount, &to)],
            );
            tx.sign_inputs(&key)?;

            send_tx(&node, &tx, &NodeConfig::default())?;
            println!("Submitted {} to {node}", HEXLOWER.encode(&tx.hash()?));
        }
    }
    Ok(())
}
