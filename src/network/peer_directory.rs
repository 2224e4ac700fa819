use crate::error::{BlockchainError, Result};
use crate::network::{NodeClient, PeerId, Version};
use log::info;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A live handle paired with the version it last reported
#[derive(Clone)]
pub struct PeerRecord {
    pub client: Arc<dyn NodeClient>,
    pub version: Version,
}

/// Registered peers, keyed by connection identity rather than address.
///
/// A node may appear once per live connection, so two records can share a
/// listen address.
pub struct PeerDirectory {
    listen_addr: String,
    peers: RwLock<HashMap<PeerId, PeerRecord>>,
}

impl PeerDirectory {
    /// An empty directory for the node listening on `listen_addr`
    pub fn new(listen_addr: &str) -> PeerDirectory {
        PeerDirectory {
            listen_addr: listen_addr.to_string(),
            peers: RwLock::new(HashMap::new()),
        }
    }

    /// Register or replace the record for `client`
    pub fn add_peer(&self, client: Arc<dyn NodeClient>, version: Version) -> Result<()> {
        let mut peers = self.peers.write().map_err(Self::poisoned)?;
        info!(
            "[{}] new peer {} (height {}), id {}",
            self.listen_addr,
            version.listen_addr,
            version.height,
            client.id()
        );
        peers.insert(client.id(), PeerRecord { client, version });
        Ok(())
    }

    /// Register `client` unless a record with the same listen address
    /// exists. Check and insert happen under one write lock, so two racing
    /// registrations of one address leave a single record.
    pub fn add_peer_if_new(&self, client: Arc<dyn NodeClient>, version: Version) -> Result<bool> {
        let mut peers = self.peers.write().map_err(Self::poisoned)?;
        if peers
            .values()
            .any(|record| record.version.listen_addr == version.listen_addr)
        {
            return Ok(false);
        }
        info!(
            "[{}] new peer {} (height {}), id {}",
            self.listen_addr,
            version.listen_addr,
            version.height,
            client.id()
        );
        peers.insert(client.id(), PeerRecord { client, version });
        Ok(true)
    }

    /// Deregister the record for connection `id`, returning it if present
    pub fn remove_peer(&self, id: PeerId) -> Result<Option<PeerRecord>> {
        let mut peers = self.peers.write().map_err(Self::poisoned)?;
        let removed = peers.remove(&id);
        if let Some(record) = &removed {
            info!(
                "[{}] removed peer {}",
                self.listen_addr, record.version.listen_addr
            );
        }
        Ok(removed)
    }

    /// Listen addresses of every registered peer
    pub fn list_addresses(&self) -> Result<Vec<String>> {
        let peers = self.peers.read().map_err(Self::poisoned)?;
        Ok(peers
            .values()
            .map(|record| record.version.listen_addr.clone())
            .collect())
    }

    /// False for our own address and for any address already registered.
    /// Always reads the current peer set.
    pub fn can_connect(&self, addr: &str) -> Result<bool> {
        if addr == self.listen_addr {
            return Ok(false);
        }
        let peers = self.peers.read().map_err(Self::poisoned)?;
        Ok(!peers
            .values()
            .any(|record| record.version.listen_addr == addr))
    }

    /// Snapshot of the live handles, so callers can dial out without
    /// holding the directory lock
    pub fn clients(&self) -> Result<Vec<Arc<dyn NodeClient>>> {
        let peers = self.peers.read().map_err(Self::poisoned)?;
        Ok(peers.values().map(|record| Arc::clone(&record.client)).collect())
    }

    /// Number of records, not of distinct addresses
    pub fn len(&self) -> usize {
        match self.peers.read() {
            Ok(peers) => peers.len(),
            Err(_) => {
                log::error!("Failed to acquire read lock on peer directory");
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned<E: std::fmt::Display>(e: E) -> BlockchainError {
        BlockchainError::Network(format!("Failed to acquire peer lock: {e}"))
    }
}
