// The chain keeps headers in append order (O(1) access by height) and
// leaves bodies to a content-addressed block store keyed by header hash.

use crate::core::{Block, Header};
use crate::error::{BlockchainError, Result};
use crate::storage::BlockStore;
use crate::utils::Hash;
use log::{debug, warn};
use std::sync::{Arc, RwLock};

/// Append-only list of headers, index == height
pub struct HeaderList {
    headers: RwLock<Vec<Header>>,
}

impl Default for HeaderList {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderList {
    pub fn new() -> HeaderList {
        HeaderList {
            headers: RwLock::new(Vec::new()),
        }
    }

    pub fn add(&self, header: Header) -> Result<()> {
        let mut headers = self.headers.write().map_err(Self::poisoned)?;
        headers.push(header);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<Header> {
        let headers = self.headers.read().map_err(Self::poisoned)?;
        headers
            .get(index)
            .cloned()
            .ok_or(BlockchainError::OutOfRange {
                requested: index,
                height: headers.len() as i64 - 1,
            })
    }

    pub fn last(&self) -> Result<Option<Header>> {
        let headers = self.headers.read().map_err(Self::poisoned)?;
        Ok(headers.last().cloned())
    }

    /// `len - 1`; an empty list has height -1
    pub fn height(&self) -> i64 {
        self.len() as i64 - 1
    }

    pub fn len(&self) -> usize {
        match self.headers.read() {
            Ok(headers) => headers.len(),
            Err(_) => {
                log::error!("Failed to acquire read lock on header list");
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned<E: std::fmt::Display>(e: E) -> BlockchainError {
        BlockchainError::Database(format!("Header list lock poisoned: {e}"))
    }
}

/// Header chain layered over a block store
pub struct Chain {
    block_store: Arc<dyn BlockStore>,
    headers: HeaderList,
}

impl Chain {
    pub fn new(block_store: Arc<dyn BlockStore>) -> Chain {
        Chain {
            block_store,
            headers: HeaderList::new(),
        }
    }

    pub fn height(&self) -> i64 {
        self.headers.height()
    }

    /// Header at the tip, if any block was added
    pub fn head(&self) -> Result<Option<Header>> {
        self.headers.last()
    }

    /// Append the header, then persist the body. A store failure is
    /// returned but the header stays appended.
    pub fn add_block(&self, block: &Block) -> Result<()> {
        self.headers.add(block.header.clone())?;
        if let Err(e) = self.block_store.put(block) {
            warn!(
                "Header at height {} appended but body was not stored: {e}",
                self.height()
            );
            return Err(e);
        }
        debug!(
            "Added block at height {} with {} transactions",
            self.height(),
            block.transactions.len()
        );
        Ok(())
    }

    pub fn get_block_by_hash(&self, hash: &Hash) -> Result<Block> {
        self.block_store.get(hash)
    }

    /// Resolves the header at `height`, re-derives its hash and looks the
    /// body up in the store.
    pub fn get_block_by_height(&self, height: usize) -> Result<Block> {
        let chain_height = self.height();
        if height as i64 > chain_height {
            return Err(BlockchainError::OutOfRange {
                requested: height,
                height: chain_height,
            });
        }
        let header = self.headers.get(height)?;
        self.get_block_by_hash(&header.hash()?)
    }

    pub fn get_header(&self, height: usize) -> Result<Header> {
        self.headers.get(height)
    }
}
