use crate::config::NodeConfig;
use crate::core::{verify_transaction, Chain, Transaction};
use crate::error::{BlockchainError, Result};
use crate::network::{
    PeerDirectory, Request, Response, RetryPolicy, TcpTransport, Transport, ValidatorMode, Version,
};
use crate::storage::{BlockStore, MemoryBlockStore, MemoryPool, SledBlockStore};
use crate::wallet::PrivateKey;
use data_encoding::HEXLOWER;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;

/// One node: a mempool, a peer directory and a header chain over a block
/// store, reachable through `handshake` and `submit_transaction`.
pub struct Node {
    pub(super) config: NodeConfig,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) peers: PeerDirectory,
    pub(super) mempool: MemoryPool,
    pub(super) chain: Chain,
    pub(super) signing_key: Option<PrivateKey>,
    pub(super) validator_mode: ValidatorMode,
    pub(super) retry: RetryPolicy,
    /// Addresses with a bootstrap dial in progress
    pub(super) dialing: Mutex<HashSet<String>>,
    pub(super) shutdown: Mutex<Option<Sender<()>>>,
}

impl Node {
    /// Validate `config` and wire a node over the given transport and
    /// block store. Nothing runs until `start`.
    pub fn new(
        config: NodeConfig,
        transport: Arc<dyn Transport>,
        block_store: Arc<dyn BlockStore>,
    ) -> Result<Arc<Node>> {
        config.validate()?;
        let signing_key = config.signing_key()?;
        let validator_mode = if config.block_production {
            ValidatorMode::ProduceBlocks
        } else {
            ValidatorMode::Stub
        };

        Ok(Arc::new(Node {
            peers: PeerDirectory::new(&config.listen_addr),
            mempool: MemoryPool::new(),
            chain: Chain::new(block_store),
            retry: RetryPolicy::from_config(&config),
            dialing: Mutex::new(HashSet::new()),
            shutdown: Mutex::new(None),
            signing_key,
            validator_mode,
            transport,
            config,
        }))
    }

    /// TCP transport, with a sled store when `store_path` is set
    pub fn from_config(config: NodeConfig) -> Result<Arc<Node>> {
        let transport = Arc::new(TcpTransport::from_config(&config));
        let block_store: Arc<dyn BlockStore> = match &config.store_path {
            Some(path) => Arc::new(SledBlockStore::open(path)?),
            None => Arc::new(MemoryBlockStore::new()),
        };
        Self::new(config, transport, block_store)
    }

    /// Dial the configured bootstrap nodes in the background and, when a
    /// signing key is configured, start the validator.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        info!(
            "[{}] starting node, version {}",
            self.listen_addr(),
            self.config.version
        );
        if !self.config.bootstrap_nodes.is_empty() {
            self.spawn_bootstrap(self.config.bootstrap_nodes.clone());
        }
        if self.signing_key.is_some() {
            self.spawn_validator()?;
        }
        Ok(())
    }

    /// Stop the validator loop. Safe to call more than once.
    pub fn shutdown(&self) {
        match self.shutdown.lock() {
            Ok(mut sender) => {
                if sender.take().is_some() {
                    info!("[{}] validator stopped", self.listen_addr());
                }
            }
            Err(e) => warn!("[{}] failed to stop validator: {e}", self.listen_addr()),
        }
    }

    /// Our current version: real chain height and known peer addresses
    pub fn version(&self) -> Result<Version> {
        Ok(Version {
            version: self.config.version.clone(),
            height: self.chain.height(),
            listen_addr: self.config.listen_addr.clone(),
            peer_list: self.peers.list_addresses()?,
        })
    }

    /// Verify and admit `tx`; a newly admitted transaction is broadcast to
    /// every peer in the background. Duplicates are acknowledged silently.
    pub fn submit_transaction(self: &Arc<Self>, tx: Transaction) -> Result<()> {
        verify_transaction(&tx)?;
        let hash = tx.hash()?;

        if !self.mempool.add(&tx)? {
            debug!(
                "[{}] transaction {} already known",
                self.listen_addr(),
                HEXLOWER.encode(&hash)
            );
            return Ok(());
        }

        info!(
            "[{}] received tx {}",
            self.listen_addr(),
            HEXLOWER.encode(&hash)
        );
        self.broadcast_transaction(tx)?;
        Ok(())
    }

    /// Fire-and-forget fan-out, one thread per peer. A peer that still
    /// cannot be reached after retries is dropped from the directory.
    /// Returns how many peers were targeted.
    pub fn broadcast_transaction(self: &Arc<Self>, tx: Transaction) -> Result<usize> {
        let clients = self.peers.clients()?;
        let tx = Arc::new(tx);

        for client in &clients {
            let node = Arc::clone(self);
            let client = Arc::clone(client);
            let tx = Arc::clone(&tx);
            thread::spawn(move || {
                let what = format!("broadcast to {}", client.addr());
                if let Err(e) = node.retry.run(&what, || client.submit_transaction(&tx)) {
                    warn!("[{}] {what} failed: {e}", node.listen_addr());
                    if e.is_transient() {
                        if let Err(e) = node.peers.remove_peer(client.id()) {
                            warn!("[{}] {e}", node.listen_addr());
                        }
                    }
                }
            });
        }
        Ok(clients.len())
    }

    /// Dispatch one wire request. Failures become `Response::Error`.
    pub fn handle_request(self: &Arc<Self>, request: Request) -> Response {
        let kind = request.kind();
        let result = match request {
            Request::Handshake { version } => Version::deserialize(&version)
                .and_then(|remote| self.handshake(remote))
                .and_then(|own| Response::version(&own)),
            Request::SubmitTransaction { transaction } => Transaction::deserialize(&transaction)
                .and_then(|tx| self.submit_transaction(tx))
                .map(|_| Response::Ack),
        };
        result.unwrap_or_else(|e| {
            warn!("[{}] {kind} rejected: {e}", self.listen_addr());
            Response::error(&e)
        })
    }

    pub fn listen_addr(&self) -> &str {
        &self.config.listen_addr
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Listen addresses of the registered peers
    pub fn peer_addresses(&self) -> Result<Vec<String>> {
        self.peers.list_addresses()
    }

    pub fn peers(&self) -> &PeerDirectory {
        &self.peers
    }

    pub fn mempool(&self) -> &MemoryPool {
        &self.mempool
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn validator_mode(&self) -> ValidatorMode {
        self.validator_mode
    }

    /// Whether a signing key is configured
    pub fn is_validator(&self) -> bool {
        self.signing_key.is_some()
    }

    pub(super) fn require_key(&self) -> Result<&PrivateKey> {
        self.signing_key.as_ref().ok_or_else(|| {
            BlockchainError::Configuration("node has no signing key".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{TxInput, TxOutput};
    use crate::network::LocalNetwork;

    fn signed_tx(amount: u64) -> Transaction {
        let key = PrivateKey::generate().unwrap();
        let mut tx = Transaction::new(
            1,
            vec![TxInput::new(&[3u8; 32], 0, &key.public())],
            vec![TxOutput::new(amount, &key.public().address())],
        );
        tx.sign_inputs(&key).unwrap();
        tx
    }

    fn lone_node(addr: &str) -> Arc<Node> {
        LocalNetwork::new().spawn_node(NodeConfig::new(addr)).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let config = NodeConfig {
            private_key: Some("zz".to_string()),
            ..NodeConfig::new("n1")
        };
        let result = Node::new(
            config,
            LocalNetwork::new().transport(),
            Arc::new(MemoryBlockStore::new()),
        );
        assert!(matches!(result, Err(BlockchainError::Configuration(_))));
    }

    #[test]
    fn test_version_reports_height_and_address() {
        let node = lone_node("n1");
        let version = node.version().unwrap();
        assert_eq!(version.listen_addr, "n1");
        assert_eq!(version.height, -1);
        assert!(version.peer_list.is_empty());
    }

    #[test]
    fn test_submit_admits_once() {
        let node = lone_node("n1");
        let tx = signed_tx(10);
        node.submit_transaction(tx.clone()).unwrap();
        node.submit_transaction(tx.clone()).unwrap();
        assert_eq!(node.mempool().len(), 1);
        assert!(node.mempool().has(&tx).unwrap());
    }

    #[test]
    fn test_submit_rejects_invalid_signature() {
        let node = lone_node("n1");
        let mut tx = signed_tx(10);
        tx.outputs[0].amount = 11;
        assert!(matches!(
            node.submit_transaction(tx),
            Err(BlockchainError::VerificationFailure(_))
        ));
        assert!(node.mempool().is_empty());
    }

    #[test]
    fn test_handle_request_reports_errors() {
        let node = lone_node("n1");
        let response = node.handle_request(Request::SubmitTransaction {
            transaction: vec![1, 2, 3],
        });
        assert!(matches!(response, Response::Error { .. }));

        let response = node.handle_request(Request::submit_transaction(&signed_tx(4)).unwrap());
        assert_eq!(response, Response::Ack);
    }

    #[test]
    fn test_huge_length_prefix_is_rejected_not_allocated() {
        let node = lone_node("n1");
        // Version 1, then an input count of 2^40
        let mut payload = vec![1u8, 253];
        payload.extend_from_slice(&(1u64 << 40).to_le_bytes());

        let response = node.handle_request(Request::SubmitTransaction {
            transaction: payload.clone(),
        });
        assert!(matches!(response, Response::Error { .. }));

        let response = node.handle_request(Request::Handshake { version: payload });
        assert!(matches!(response, Response::Error { .. }));
        assert!(node.mempool().is_empty());
        assert!(node.peers().is_empty());
    }
}
