//! Data storage
//!
//! Content-addressed block bodies (in memory or in sled) and the memory
//! pool of transactions waiting for a block.

pub mod block_store;
pub mod memory_pool;

pub use block_store::{BlockStore, MemoryBlockStore, SledBlockStore};
pub use memory_pool::MemoryPool;
