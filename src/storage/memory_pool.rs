use crate::core::Transaction;
use crate::error::{BlockchainError, Result};
use crate::utils::Hash;
use data_encoding::HEXLOWER;
use std::collections::HashMap;
use std::sync::RwLock;

/// ( K -> tx hash hex, V => Transaction )
///
/// Presence is binary: a transaction is either admitted or not. Admission
/// is check-and-insert under one write lock, so a transaction is admitted
/// at most once no matter how many callers race to add it.
pub struct MemoryPool {
    inner: RwLock<HashMap<String, Transaction>>,
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPool {
    pub fn new() -> MemoryPool {
        MemoryPool {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Membership by canonical hash
    pub fn has(&self, tx: &Transaction) -> Result<bool> {
        let key = Self::key(&tx.hash()?);
        let pool = self.inner.read().map_err(Self::poisoned)?;
        Ok(pool.contains_key(&key))
    }

    /// Returns `false` without touching the pool if `tx` is already present
    pub fn add(&self, tx: &Transaction) -> Result<bool> {
        let key = Self::key(&tx.hash()?);
        let mut pool = self.inner.write().map_err(Self::poisoned)?;
        if pool.contains_key(&key) {
            return Ok(false);
        }
        pool.insert(key, tx.clone());
        Ok(true)
    }

    /// Drop everything in one critical section
    pub fn clear(&self) -> Result<()> {
        let mut pool = self.inner.write().map_err(Self::poisoned)?;
        pool.clear();
        Ok(())
    }

    /// Snapshot of every pending transaction
    pub fn pending(&self) -> Result<Vec<Transaction>> {
        let pool = self.inner.read().map_err(Self::poisoned)?;
        Ok(pool.values().cloned().collect())
    }

    /// Drop the given transactions, leaving anything admitted since untouched.
    /// Returns how many were removed.
    pub fn remove_many(&self, hashes: &[Hash]) -> Result<usize> {
        let mut pool = self.inner.write().map_err(Self::poisoned)?;
        Ok(hashes
            .iter()
            .filter(|hash| pool.remove(&Self::key(hash)).is_some())
            .count())
    }

    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(pool) => pool.len(),
            Err(_) => {
                log::error!("Failed to acquire read lock on memory pool");
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key(hash: &Hash) -> String {
        HEXLOWER.encode(hash)
    }

    fn poisoned<E: std::fmt::Display>(e: E) -> BlockchainError {
        BlockchainError::Database(format!("Memory pool lock poisoned: {e}"))
    }
}
