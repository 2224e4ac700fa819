use crate::core::Transaction;
use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize};
use serde::{Deserialize, Serialize};

/// What a node reports about itself on every handshake. A snapshot, not a
/// subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Version {
    pub version: String,
    pub height: i64,
    pub listen_addr: String,
    pub peer_list: Vec<String>,
}

impl Version {
    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Version> {
        deserialize(bytes)
    }
}

/// Wire request. Payloads are the canonical bytes of the carried value,
/// the same bytes that are hashed and signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    Handshake { version: Vec<u8> },
    SubmitTransaction { transaction: Vec<u8> },
}

impl Request {
    pub fn handshake(version: &Version) -> Result<Request> {
        Ok(Request::Handshake {
            version: version.serialize()?,
        })
    }

    pub fn submit_transaction(tx: &Transaction) -> Result<Request> {
        Ok(Request::SubmitTransaction {
            transaction: tx.serialize()?,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Request::Handshake { .. } => "handshake",
            Request::SubmitTransaction { .. } => "submit_transaction",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Version { version: Vec<u8> },
    Ack,
    Error { message: String },
}

impl Response {
    pub fn version(version: &Version) -> Result<Response> {
        Ok(Response::Version {
            version: version.serialize()?,
        })
    }

    pub fn error(err: &BlockchainError) -> Response {
        Response::Error {
            message: err.to_string(),
        }
    }

    pub fn into_version(self) -> Result<Version> {
        match self {
            Response::Version { version } => Version::deserialize(&version),
            Response::Error { message } => Err(BlockchainError::Network(message)),
            other => Err(BlockchainError::Network(format!(
                "Expected version response, got {other:?}"
            ))),
        }
    }

    pub fn into_ack(self) -> Result<()> {
        match self {
            Response::Ack => Ok(()),
            Response::Error { message } => Err(BlockchainError::Network(message)),
            other => Err(BlockchainError::Network(format!(
                "Expected ack, got {other:?}"
            ))),
        }
    }
}
