//! # Gossip Chain
//!
//! A small peer-to-peer blockchain node. Nodes find each other through a
//! version handshake whose peer lists are gossiped on, pass submitted
//! transactions through a deduplicating mempool, and keep an append-only
//! header chain over content-addressed block storage.
//!
//! ## Layout
//! - `core/`: transactions, blocks, headers, merkle root, the header chain
//! - `storage/`: block stores (memory and sled) and the memory pool
//! - `network/`: wire messages, transports, peer directory, gossip, the
//!   node service with its validator tick, and the TCP server
//! - `wallet/`: ed25519 keys, signatures and addresses
//! - `config/`: node settings (defaults, TOML, environment)
//! - `utils/`: hashing, timestamps, canonical encoding
//! - `cli/`: argument parsing for the binary
//!
//! Every hashed or signed value is hashed over its bincode encoding, and
//! the same bytes go over the wire inside a JSON envelope.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod storage;
pub mod utils;
pub mod wallet;

// Re-export commonly used types for convenience
pub use cli::{Command, NodeArgs, Opt};
pub use config::{NodeConfig, DEFAULT_NODE_ADDR, DEFAULT_VERSION};
pub use core::{
    sign_block, sign_transaction, verify_block, verify_transaction, Block, Chain, Header,
    HeaderList, MerkleTree, Transaction, TxInput, TxOutput,
};
pub use error::{BlockchainError, Result};
pub use network::{
    LocalNetwork, Node, NodeClient, PeerDirectory, Request, Response, RetryPolicy, Server,
    TcpTransport, Transport, ValidatorMode, Version,
};
pub use storage::{BlockStore, MemoryBlockStore, MemoryPool, SledBlockStore};
pub use utils::{current_timestamp, sha256_digest, Hash};
pub use wallet::{Address, PrivateKey, PublicKey, Signature};
