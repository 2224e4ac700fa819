use crate::config::NodeConfig;
use crate::core::Transaction;
use crate::error::{BlockchainError, Result};
use crate::network::{Node, Request, TcpTransport, Transport};
use log::{debug, error, info};
use serde_json::Deserializer;
use std::io::{BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Accept loop for one node, one thread per inbound connection
pub struct Server {
    node: Arc<Node>,
    listener: TcpListener,
}

impl Server {
    /// Bind the node's configured listen address
    pub fn bind(node: Arc<Node>) -> Result<Server> {
        let addr = node.listen_addr().to_string();
        let listener = TcpListener::bind(&addr)
            .map_err(|e| BlockchainError::Network(format!("Failed to bind to {addr}: {e}")))?;
        Ok(Self::from_listener(node, listener))
    }

    pub fn from_listener(node: Arc<Node>, listener: TcpListener) -> Server {
        Server { node, listener }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Start the node, then serve until the listener fails
    pub fn run(self) -> Result<()> {
        info!(
            "[{}] server listening on {}",
            self.node.listen_addr(),
            self.local_addr()?
        );
        self.node.start()?;

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let node = Arc::clone(&self.node);
                    thread::spawn(move || {
                        if let Err(e) = Self::handle_connection(&node, stream) {
                            error!("[{}] error handling connection: {e}", node.listen_addr());
                        }
                    });
                }
                Err(e) => {
                    error!(
                        "[{}] error accepting connection: {e}",
                        self.node.listen_addr()
                    );
                }
            }
        }
        Ok(())
    }

    pub fn spawn(self) -> JoinHandle<Result<()>> {
        thread::spawn(move || self.run())
    }

    fn handle_connection(node: &Arc<Node>, stream: TcpStream) -> Result<()> {
        let peer_addr = stream.peer_addr()?;
        Self::apply_timeouts(&stream, node.config().call_timeout())?;

        let reader = BufReader::new(&stream);
        let requests = Deserializer::from_reader(reader).into_iter::<Request>();

        for request in requests {
            let request = request.map_err(|e| {
                BlockchainError::Network(format!("Failed to deserialize request: {e}"))
            })?;
            debug!(
                "[{}] {} from {peer_addr}",
                node.listen_addr(),
                request.kind()
            );

            let response = node.handle_request(request);
            let mut writer = &stream;
            serde_json::to_writer(writer, &response)
                .map_err(|e| BlockchainError::Network(format!("Failed to send response: {e}")))?;
            writer.flush()?;
        }

        let _ = stream.shutdown(Shutdown::Both);
        Ok(())
    }

    /// Bound both directions so a silent or non-reading client cannot pin
    /// a connection thread
    fn apply_timeouts(stream: &TcpStream, timeout: Duration) -> Result<()> {
        stream
            .set_read_timeout(Some(timeout))
            .map_err(|e| BlockchainError::Network(format!("Failed to set read timeout: {e}")))?;
        stream
            .set_write_timeout(Some(timeout))
            .map_err(|e| BlockchainError::Network(format!("Failed to set write timeout: {e}")))?;
        Ok(())
    }
}

/// Submit one transaction to the node at `addr`
pub fn send_tx(addr: &str, tx: &Transaction, config: &NodeConfig) -> Result<()> {
    let client = TcpTransport::from_config(config).dial(addr)?;
    client.submit_transaction(tx)
}
