use crate::config::NodeConfig;
use crate::core::Transaction;
use crate::error::{BlockchainError, Result};
use crate::network::{Request, Response, Version};
use log::debug;
use std::io::BufReader;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Identity of one live connection handle. Unique per transport.
pub type PeerId = u64;

/// A live handle to a remote node
pub trait NodeClient: Send + Sync {
    fn id(&self) -> PeerId;

    /// The address this handle dials
    fn addr(&self) -> &str;

    /// Send our version, receive theirs
    fn handshake(&self, version: &Version) -> Result<Version>;

    fn submit_transaction(&self, tx: &Transaction) -> Result<()>;
}

/// Creates client handles to remote addresses
pub trait Transport: Send + Sync {
    fn dial(&self, addr: &str) -> Result<Arc<dyn NodeClient>>;
}

/// One JSON request per TCP connection, with bounded connect and
/// read/write timeouts.
///
/// Failures up to and including sending the request are `ConnectFailure`
/// and may be retried; a missing or broken reply is a `Network` error,
/// since the remote may already have handled the request.
pub struct TcpTransport {
    dial_timeout: Duration,
    call_timeout: Duration,
    next_id: AtomicU64,
}

impl TcpTransport {
    /// `dial_timeout` bounds the connect, `call_timeout` each read and write
    pub fn new(dial_timeout: Duration, call_timeout: Duration) -> TcpTransport {
        TcpTransport {
            dial_timeout,
            call_timeout,
            next_id: AtomicU64::new(1),
        }
    }

    /// Timeouts from `dial_timeout_ms` and `call_timeout_ms`
    pub fn from_config(config: &NodeConfig) -> TcpTransport {
        Self::new(config.dial_timeout(), config.call_timeout())
    }
}

impl Transport for TcpTransport {
    fn dial(&self, addr: &str) -> Result<Arc<dyn NodeClient>> {
        let socket_addr = addr
            .to_socket_addrs()
            .map_err(|e| BlockchainError::connect(addr, format!("Invalid address: {e}")))?
            .next()
            .ok_or_else(|| BlockchainError::connect(addr, "Address did not resolve"))?;

        Ok(Arc::new(TcpClient {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            addr: addr.to_string(),
            socket_addr,
            dial_timeout: self.dial_timeout,
            call_timeout: self.call_timeout,
        }))
    }
}

/// Handle to one remote address; opens a fresh connection per call
pub struct TcpClient {
    id: PeerId,
    addr: String,
    socket_addr: SocketAddr,
    dial_timeout: Duration,
    call_timeout: Duration,
}

impl TcpClient {
    fn call(&self, request: &Request) -> Result<Response> {
        debug!("Sending {} to {}", request.kind(), self.addr);

        let stream = TcpStream::connect_timeout(&self.socket_addr, self.dial_timeout)
            .map_err(|e| BlockchainError::connect(&self.addr, e))?;
        stream
            .set_write_timeout(Some(self.call_timeout))
            .map_err(|e| BlockchainError::connect(&self.addr, e))?;
        stream
            .set_read_timeout(Some(self.call_timeout))
            .map_err(|e| BlockchainError::connect(&self.addr, e))?;

        serde_json::to_writer(&stream, request)
            .map_err(|e| BlockchainError::connect(&self.addr, format!("Failed to send: {e}")))?;
        // The half-close tells the server the request is complete. From here
        // on the remote may have acted on it, so failures are not transient.
        stream.shutdown(Shutdown::Write).map_err(|e| {
            BlockchainError::Network(format!("Failed to finish request to {}: {e}", self.addr))
        })?;

        let response: Response = serde_json::from_reader(BufReader::new(&stream)).map_err(|e| {
            BlockchainError::Network(format!("No response from {}: {e}", self.addr))
        })?;
        let _ = stream.shutdown(Shutdown::Both);
        Ok(response)
    }
}

impl NodeClient for TcpClient {
    fn id(&self) -> PeerId {
        self.id
    }

    fn addr(&self) -> &str {
        &self.addr
    }

    fn handshake(&self, version: &Version) -> Result<Version> {
        self.call(&Request::handshake(version)?)?.into_version()
    }

    fn submit_transaction(&self, tx: &Transaction) -> Result<()> {
        self.call(&Request::submit_transaction(tx)?)?.into_ack()
    }
}
