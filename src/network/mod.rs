//! Peer-to-peer networking
//!
//! The wire messages, the client/transport seam (TCP and in-process), the
//! peer directory, the handshake and gossip protocol, the node service with
//! its validator tick, and the TCP server that exposes it.

pub mod client;
pub mod gossip;
pub mod local;
pub mod message;
pub mod node;
pub mod peer_directory;
pub mod retry;
pub mod server;
pub mod validator;

pub use client::{NodeClient, PeerId, TcpClient, TcpTransport, Transport};
pub use local::{LocalClient, LocalNetwork, LocalTransport};
pub use message::{Request, Response, Version};
pub use node::Node;
pub use peer_directory::{PeerDirectory, PeerRecord};
pub use retry::RetryPolicy;
pub use server::{send_tx, Server};
pub use validator::ValidatorMode;
