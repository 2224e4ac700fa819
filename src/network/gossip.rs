// Handshake and transitive peer discovery. Every registered version's peer
// list is fed back into bootstrap; `can_connect` is what makes repeated
// gossip of the same address converge.

use crate::error::{BlockchainError, Result};
use crate::network::{Node, NodeClient, Version};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

impl Node {
    /// Inbound handshake: dial back the address the remote claims, register
    /// it and answer with our own version.
    pub fn handshake(self: &Arc<Self>, remote: Version) -> Result<Version> {
        debug!(
            "[{}] handshake from {}",
            self.listen_addr(),
            remote.listen_addr
        );
        let client = self.transport.dial(&remote.listen_addr)?;
        self.register_peer(client, remote)?;
        self.version()
    }

    /// Dial each candidate that passes `can_connect`, concurrently. A
    /// failed address is logged and skipped. Returns the number of new
    /// peers.
    pub fn bootstrap_network(self: &Arc<Self>, addrs: &[String]) -> usize {
        thread::scope(|scope| {
            let attempts: Vec<_> = addrs
                .iter()
                .map(|addr| scope.spawn(move || self.try_connect(addr)))
                .collect();
            attempts
                .into_iter()
                .map(|attempt| attempt.join())
                .filter(|joined| matches!(joined, Ok(true)))
                .count()
        })
    }

    /// Open a client to `addr`, exchange versions and register the remote.
    /// Only failures before the request reached the remote are retried.
    pub fn dial_remote_node(self: &Arc<Self>, addr: &str) -> Result<Version> {
        let client = self.transport.dial(addr)?;
        let what = format!("handshake with {addr}");
        let remote = self
            .retry
            .run(&what, || client.handshake(&self.version()?))?;
        self.register_peer(client, remote.clone())?;
        Ok(remote)
    }

    pub(super) fn spawn_bootstrap(self: &Arc<Self>, addrs: Vec<String>) -> JoinHandle<usize> {
        let node = Arc::clone(self);
        thread::spawn(move || node.bootstrap_network(&addrs))
    }

    /// A remote whose address is already registered (e.g. both sides dialed
    /// each other at once) keeps its existing record.
    fn register_peer(self: &Arc<Self>, client: Arc<dyn NodeClient>, version: Version) -> Result<()> {
        let peer_list = version.peer_list.clone();
        let addr = version.listen_addr.clone();
        if !self.peers.add_peer_if_new(client, version)? {
            debug!("[{}] {addr} already registered", self.listen_addr());
        }
        if !peer_list.is_empty() {
            self.spawn_bootstrap(peer_list);
        }
        Ok(())
    }

    fn try_connect(self: &Arc<Self>, addr: &str) -> bool {
        let guard = match DialGuard::acquire(&self.dialing, addr) {
            Ok(Some(guard)) => guard,
            Ok(None) => {
                debug!("[{}] dial to {addr} already in flight", self.listen_addr());
                return false;
            }
            Err(e) => {
                warn!("[{}] {e}", self.listen_addr());
                return false;
            }
        };

        match self.peers.can_connect(addr) {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                warn!("[{}] {e}", self.listen_addr());
                return false;
            }
        }

        let connected = match self.dial_remote_node(addr) {
            Ok(remote) => {
                info!(
                    "[{}] connected to {} (height {})",
                    self.listen_addr(),
                    remote.listen_addr,
                    remote.height
                );
                true
            }
            Err(e) => {
                warn!("[{}] failed to connect to {addr}: {e}", self.listen_addr());
                false
            }
        };
        drop(guard);
        connected
    }
}

/// Marks an address as being dialed until dropped
struct DialGuard<'a> {
    dialing: &'a Mutex<HashSet<String>>,
    addr: String,
}

impl<'a> DialGuard<'a> {
    fn acquire(dialing: &'a Mutex<HashSet<String>>, addr: &str) -> Result<Option<DialGuard<'a>>> {
        let mut in_flight = dialing
            .lock()
            .map_err(|e| BlockchainError::Network(format!("Failed to acquire dial lock: {e}")))?;
        if !in_flight.insert(addr.to_string()) {
            return Ok(None);
        }
        Ok(Some(DialGuard {
            dialing,
            addr: addr.to_string(),
        }))
    }
}

impl Drop for DialGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.dialing.lock() {
            in_flight.remove(&self.addr);
        }
    }
}
