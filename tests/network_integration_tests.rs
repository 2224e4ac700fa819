//! Network integration tests
//!
//! Multi-node handshake, gossip and transaction propagation on the
//! in-process transport, plus one end-to-end run over TCP.

use gossip_chain::network::{send_tx, PeerId};
use gossip_chain::{
    BlockchainError, LocalNetwork, MemoryBlockStore, Node, NodeClient, NodeConfig, PrivateKey,
    Result, Server, TcpTransport, Transaction, TxInput, TxOutput, Version,
};
use std::collections::HashSet;
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(5);

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

fn config(addr: &str) -> NodeConfig {
    NodeConfig {
        retry_attempts: 2,
        retry_backoff_ms: 5,
        ..NodeConfig::new(addr)
    }
}

fn addrs(node: &Node) -> HashSet<String> {
    node.peer_addresses().unwrap().into_iter().collect()
}

fn knows(node: &Node, addr: &str) -> bool {
    addrs(node).contains(addr)
}

fn signed_tx(amount: u64) -> Transaction {
    let key = PrivateKey::generate().unwrap();
    let mut tx = Transaction::new(
        1,
        vec![TxInput::new(&[amount as u8; 32], 0, &key.public())],
        vec![TxOutput::new(amount, &key.public().address())],
    );
    tx.sign_inputs(&key).unwrap();
    tx
}

#[test]
fn test_bootstrap_registers_both_sides() {
    let network = LocalNetwork::new();
    let a = network.spawn_node(config("a")).unwrap();
    let b = network.spawn_node(config("b")).unwrap();

    assert_eq!(a.bootstrap_network(&["b".to_string()]), 1);
    assert!(knows(&a, "b"));
    assert!(knows(&b, "a"));

    // Already known, nothing new
    assert_eq!(a.bootstrap_network(&["b".to_string(), "a".to_string()]), 0);
}

#[test]
fn test_bootstrap_from_config_on_start() {
    let network = LocalNetwork::new();
    let seed = network.spawn_node(config("seed")).unwrap();
    let joiner = network
        .spawn_node(NodeConfig {
            bootstrap_nodes: vec!["seed".to_string()],
            ..config("joiner")
        })
        .unwrap();

    assert!(wait_until(|| knows(&joiner, "seed") && knows(&seed, "joiner")));
}

#[test]
fn test_unreachable_peer_does_not_abort_batch() {
    let network = LocalNetwork::new();
    let a = network.spawn_node(config("a")).unwrap();
    let _b = network.spawn_node(config("b")).unwrap();

    let connected = a.bootstrap_network(&["ghost".to_string(), "b".to_string()]);
    assert_eq!(connected, 1);
    assert_eq!(addrs(&a), HashSet::from(["b".to_string()]));
}

#[test]
fn test_gossip_reaches_fresh_address() {
    let network = LocalNetwork::new();
    let nodes: Vec<Arc<Node>> = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|addr| network.spawn_node(config(addr)).unwrap())
        .collect();
    let (a, d, e) = (&nodes[0], &nodes[3], &nodes[4]);

    a.bootstrap_network(&["b".to_string(), "c".to_string()]);
    d.bootstrap_network(&["b".to_string(), "e".to_string()]);
    assert!(knows(d, "e"));

    // D hands A a peer list with B (already known) and E (fresh)
    d.bootstrap_network(&["a".to_string()]);
    assert!(wait_until(|| knows(a, "e") && knows(e, "a")));

    // Every node eventually reaches every other one, and never itself
    let everyone: Vec<&str> = vec!["a", "b", "c", "d", "e"];
    assert!(wait_until(|| {
        nodes.iter().all(|node| {
            let known = addrs(node);
            !known.contains(node.listen_addr())
                && everyone
                    .iter()
                    .filter(|addr| **addr != node.listen_addr())
                    .all(|addr| known.contains(*addr))
        })
    }));

    // Converged gossip leaves one record per address
    thread::sleep(Duration::from_millis(100));
    for node in &nodes {
        let listed = node.peer_addresses().unwrap();
        assert_eq!(listed.len(), addrs(node).len(), "{}", node.listen_addr());
        assert_eq!(listed.len(), everyone.len() - 1);
    }

    // Re-bootstrapping against a known address is skipped
    assert_eq!(d.bootstrap_network(&["b".to_string()]), 0);
    assert_eq!(d.peer_addresses().unwrap().len(), everyone.len() - 1);
}

#[test]
fn test_transaction_propagates_across_mesh() {
    let network = LocalNetwork::new();
    let a = network.spawn_node(config("a")).unwrap();
    let b = network.spawn_node(config("b")).unwrap();
    let c = network.spawn_node(config("c")).unwrap();
    b.bootstrap_network(&["a".to_string()]);
    c.bootstrap_network(&["b".to_string()]);

    let tx = signed_tx(42);
    a.submit_transaction(tx.clone()).unwrap();

    assert!(wait_until(|| {
        [&a, &b, &c]
            .iter()
            .all(|node| node.mempool().has(&tx).unwrap())
    }));
    for node in [&a, &b, &c] {
        assert_eq!(node.mempool().len(), 1);
    }
}

#[test]
fn test_invalid_transaction_is_rejected_remotely() {
    let network = LocalNetwork::new();
    let a = network.spawn_node(config("a")).unwrap();
    let client = network.transport().dial("a").unwrap();

    let mut tx = signed_tx(7);
    tx.outputs[0].amount = 8;
    let err = client.submit_transaction(&tx).unwrap_err();
    assert!(matches!(err, BlockchainError::Network(_)));
    assert!(a.mempool().is_empty());
}

struct CountingClient {
    submits: AtomicUsize,
}

impl NodeClient for CountingClient {
    fn id(&self) -> PeerId {
        u64::MAX
    }

    fn addr(&self) -> &str {
        "counter"
    }

    fn handshake(&self, _version: &Version) -> Result<Version> {
        Err(BlockchainError::connect("counter", "not dialable"))
    }

    fn submit_transaction(&self, _tx: &Transaction) -> Result<()> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_concurrent_duplicate_submit_broadcasts_once() {
    let network = LocalNetwork::new();
    let node = network.spawn_node(config("n")).unwrap();
    let counter = Arc::new(CountingClient {
        submits: AtomicUsize::new(0),
    });
    node.peers()
        .add_peer(
            counter.clone(),
            Version {
                version: "test".to_string(),
                height: -1,
                listen_addr: "counter".to_string(),
                peer_list: vec![],
            },
        )
        .unwrap();

    let tx = signed_tx(11);
    let barrier = Arc::new(Barrier::new(8));
    let submitters: Vec<_> = (0..8)
        .map(|_| {
            let node = Arc::clone(&node);
            let tx = tx.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                node.submit_transaction(tx).unwrap();
            })
        })
        .collect();
    for submitter in submitters {
        submitter.join().unwrap();
    }

    assert!(wait_until(|| counter.submits.load(Ordering::SeqCst) >= 1));
    thread::sleep(Duration::from_millis(100));
    assert_eq!(counter.submits.load(Ordering::SeqCst), 1);
    assert_eq!(node.mempool().len(), 1);
}

#[test]
fn test_unreachable_peer_is_evicted_on_broadcast() {
    let network = LocalNetwork::new();
    let a = network.spawn_node(config("a")).unwrap();
    let _b = network.spawn_node(config("b")).unwrap();
    a.bootstrap_network(&["b".to_string()]);
    assert!(knows(&a, "b"));

    network.unregister("b").unwrap();
    a.submit_transaction(signed_tx(3)).unwrap();
    assert!(wait_until(|| !knows(&a, "b")));
}

#[test]
fn test_block_producing_validator() {
    let network = LocalNetwork::new();
    let validator = network
        .spawn_node(NodeConfig {
            private_key: Some(PrivateKey::generate().unwrap().seed_hex()),
            block_production: true,
            block_time_ms: 25,
            ..config("validator")
        })
        .unwrap();
    let txs: Vec<_> = (1..=3).map(signed_tx).collect();
    for tx in &txs {
        validator.submit_transaction(tx.clone()).unwrap();
    }

    assert!(wait_until(|| validator.mempool().is_empty()));
    let height = validator.chain().height();
    assert!(height >= 0);
    let sealed: usize = (0..=height as usize)
        .map(|h| validator.chain().get_block_by_height(h).unwrap().transactions.len())
        .sum();
    assert_eq!(sealed, txs.len());
    assert_eq!(validator.version().unwrap().height, height);
    validator.shutdown();
}

fn tcp_node(bootstrap: Vec<String>) -> (Arc<Node>, Server) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let node_config = NodeConfig {
        bootstrap_nodes: bootstrap,
        dial_timeout_ms: 500,
        call_timeout_ms: 2_000,
        ..config(&addr)
    };
    let node = Node::new(
        node_config.clone(),
        Arc::new(TcpTransport::from_config(&node_config)),
        Arc::new(MemoryBlockStore::new()),
    )
    .unwrap();
    let server = Server::from_listener(Arc::clone(&node), listener);
    (node, server)
}

#[test]
fn test_tcp_end_to_end() {
    let (a, server_a) = tcp_node(vec![]);
    server_a.spawn();
    let (b, server_b) = tcp_node(vec![a.listen_addr().to_string()]);
    server_b.spawn();

    assert!(wait_until(|| knows(&a, b.listen_addr()) && knows(&b, a.listen_addr())));

    let tx = signed_tx(99);
    send_tx(b.listen_addr(), &tx, b.config()).unwrap();
    assert!(wait_until(|| a.mempool().has(&tx).unwrap()));
    assert!(b.mempool().has(&tx).unwrap());
}
