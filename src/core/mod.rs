//! Core chain functionality
//!
//! Transactions, blocks and headers with their canonical hashes, the
//! merkle commitment of a block body, and the header chain.

pub mod block;
pub mod chain;
pub mod merkle;
pub mod transaction;

pub use block::{sign_block, verify_block, Block, Header, BLOCK_VERSION};
pub use chain::{Chain, HeaderList};
pub use merkle::MerkleTree;
pub use transaction::{sign_transaction, verify_transaction, Transaction, TxInput, TxOutput};
