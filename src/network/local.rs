use crate::config::NodeConfig;
use crate::core::Transaction;
use crate::error::{BlockchainError, Result};
use crate::network::{Node, NodeClient, PeerId, Request, Response, Transport, Version};
use crate::storage::MemoryBlockStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

/// In-process network: nodes registered by listen address, calls routed
/// straight into `Node::handle_request`. Used for simulations and tests.
#[derive(Clone, Default)]
pub struct LocalNetwork {
    nodes: Arc<RwLock<HashMap<String, Weak<Node>>>>,
    next_id: Arc<AtomicU64>,
}

impl LocalNetwork {
    pub fn new() -> LocalNetwork {
        Self::default()
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::new(LocalTransport {
            network: self.clone(),
        })
    }

    pub fn register(&self, node: &Arc<Node>) -> Result<()> {
        let mut nodes = self.nodes.write().map_err(Self::poisoned)?;
        nodes.insert(node.listen_addr().to_string(), Arc::downgrade(node));
        Ok(())
    }

    /// Make `addr` unreachable
    pub fn unregister(&self, addr: &str) -> Result<()> {
        let mut nodes = self.nodes.write().map_err(Self::poisoned)?;
        nodes.remove(addr);
        Ok(())
    }

    /// Build a node on this network with an in-memory store, register it
    /// and start it
    pub fn spawn_node(&self, config: NodeConfig) -> Result<Arc<Node>> {
        let node = Node::new(config, self.transport(), Arc::new(MemoryBlockStore::new()))?;
        self.register(&node)?;
        node.start()?;
        Ok(node)
    }

    fn lookup(&self, addr: &str) -> Result<Arc<Node>> {
        let nodes = self.nodes.read().map_err(Self::poisoned)?;
        nodes
            .get(addr)
            .and_then(Weak::upgrade)
            .ok_or_else(|| BlockchainError::connect(addr, "No node listening"))
    }

    fn poisoned<E: std::fmt::Display>(e: E) -> BlockchainError {
        BlockchainError::Network(format!("Failed to acquire local network lock: {e}"))
    }
}

pub struct LocalTransport {
    network: LocalNetwork,
}

impl Transport for LocalTransport {
    fn dial(&self, addr: &str) -> Result<Arc<dyn NodeClient>> {
        Ok(Arc::new(LocalClient {
            id: self.network.next_id.fetch_add(1, Ordering::Relaxed),
            addr: addr.to_string(),
            network: self.network.clone(),
        }))
    }
}

pub struct LocalClient {
    id: PeerId,
    addr: String,
    network: LocalNetwork,
}

impl LocalClient {
    fn call(&self, request: Request) -> Result<Response> {
        let node = self.network.lookup(&self.addr)?;
        Ok(node.handle_request(request))
    }
}

impl NodeClient for LocalClient {
    fn id(&self) -> PeerId {
        self.id
    }

    fn addr(&self) -> &str {
        &self.addr
    }

    fn handshake(&self, version: &Version) -> Result<Version> {
        self.call(Request::handshake(version)?)?.into_version()
    }

    fn submit_transaction(&self, tx: &Transaction) -> Result<()> {
        self.call(Request::submit_transaction(tx)?)?.into_ack()
    }
}
