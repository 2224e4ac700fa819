use crate::core::Block;
use crate::error::{BlockchainError, Result};
use crate::utils::Hash;
use data_encoding::HEXLOWER;
use log::debug;
use sled::{Db, Tree};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

const BLOCKS_TREE: &str = "blocks";

/// Content-addressed block bodies, keyed by header hash
pub trait BlockStore: Send + Sync {
    /// Store `block` under its hash, replacing any block already there
    fn put(&self, block: &Block) -> Result<()>;

    /// Fetch the block stored under `hash`, or `NotFound`
    fn get(&self, hash: &Hash) -> Result<Block>;
}

/// ( K -> block hash hex, V -> Block )
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<String, Block>>,
}

impl Default for MemoryBlockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBlockStore {
    pub fn new() -> MemoryBlockStore {
        MemoryBlockStore {
            blocks: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.read().map(|blocks| blocks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlockStore for MemoryBlockStore {
    fn put(&self, block: &Block) -> Result<()> {
        let hash = HEXLOWER.encode(&block.hash()?);
        let mut blocks = self
            .blocks
            .write()
            .map_err(|e| BlockchainError::Database(format!("Failed to acquire block lock: {e}")))?;
        blocks.insert(hash, block.clone());
        Ok(())
    }

    fn get(&self, hash: &Hash) -> Result<Block> {
        let hash = HEXLOWER.encode(hash);
        let blocks = self
            .blocks
            .read()
            .map_err(|e| BlockchainError::Database(format!("Failed to acquire block lock: {e}")))?;
        blocks
            .get(&hash)
            .cloned()
            .ok_or_else(|| BlockchainError::NotFound(format!("block with hash [{hash}] does not exist")))
    }
}

/// Block bodies persisted in a sled tree, values in canonical encoding
pub struct SledBlockStore {
    db: Db,
    blocks: Tree,
}

impl SledBlockStore {
    /// Open or create the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<SledBlockStore> {
        let db = sled::open(path.as_ref())
            .map_err(|e| BlockchainError::Database(format!("Failed to open database: {e}")))?;
        let blocks = db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| BlockchainError::Database(format!("Failed to open blocks tree: {e}")))?;
        debug!("Opened block store at {}", path.as_ref().display());
        Ok(SledBlockStore { db, blocks })
    }

    /// Force pending writes to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl BlockStore for SledBlockStore {
    fn put(&self, block: &Block) -> Result<()> {
        let hash = block.hash()?;
        let block_data = block.serialize()?;
        self.blocks
            .insert(hash, block_data)
            .map_err(|e| BlockchainError::Database(format!("Failed to store block: {e}")))?;
        Ok(())
    }

    fn get(&self, hash: &Hash) -> Result<Block> {
        let data = self
            .blocks
            .get(hash)
            .map_err(|e| BlockchainError::Database(format!("Failed to get block: {e}")))?
            .ok_or_else(|| {
                BlockchainError::NotFound(format!(
                    "block with hash [{}] does not exist",
                    HEXLOWER.encode(hash)
                ))
            })?;
        Block::deserialize(data.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Block;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    fn empty_block(parent: Option<&Block>) -> Block {
        Block::assemble(parent.map(|b| &b.header), vec![]).unwrap()
    }

    fn check_put_get(store: &dyn BlockStore) {
        let block = empty_block(None);
        let hash = block.hash().unwrap();

        assert!(matches!(store.get(&hash), Err(BlockchainError::NotFound(_))));
        store.put(&block).unwrap();
        assert_eq!(store.get(&hash).unwrap(), block);

        // Overwrite at the same key is allowed
        store.put(&block).unwrap();
        assert_eq!(store.get(&hash).unwrap(), block);
    }

    #[test]
    fn test_memory_store_put_get() {
        let store = MemoryBlockStore::new();
        check_put_get(&store);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sled_store_put_get() {
        let temp_dir = tempdir().unwrap();
        let store = SledBlockStore::open(temp_dir.path().join("blocks")).unwrap();
        check_put_get(&store);
    }

    #[test]
    fn test_sled_store_survives_reopen() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("blocks");
        let block = empty_block(None);
        {
            let store = SledBlockStore::open(&path).unwrap();
            store.put(&block).unwrap();
            store.flush().unwrap();
        }
        let store = SledBlockStore::open(&path).unwrap();
        assert_eq!(store.get(&block.hash().unwrap()).unwrap(), block);
    }

    #[test]
    fn test_concurrent_put_get() {
        let store = Arc::new(MemoryBlockStore::new());
        let first = empty_block(None);
        let mut blocks = vec![first.clone()];
        for _ in 0..15 {
            let next = empty_block(blocks.last());
            blocks.push(next);
        }

        let handles: Vec<_> = blocks
            .clone()
            .into_iter()
            .map(|block| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store.put(&block).unwrap();
                    store.get(&block.hash().unwrap()).unwrap()
                })
            })
            .collect();

        for (handle, block) in handles.into_iter().zip(blocks.iter()) {
            assert_eq!(&handle.join().unwrap(), block);
        }
        assert_eq!(store.len(), blocks.len());
    }
}
