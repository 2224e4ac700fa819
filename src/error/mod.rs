//! Error handling for the node
//!
//! One error type for every layer: chain queries, the wire, key material
//! and configuration all report through `BlockchainError`.

use std::fmt;

/// Result type alias for node operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Error types for node operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    /// No block is stored under the requested hash
    NotFound(String),
    /// Requested height is above the current chain height
    OutOfRange { requested: usize, height: i64 },
    /// Dialing or calling a remote node failed
    ConnectFailure { addr: String, reason: String },
    /// A signature or structural check did not hold
    VerificationFailure(String),
    /// Malformed key material, fixed-length input or config value
    Configuration(String),
    /// Database-related errors
    Database(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// Protocol-level errors (unexpected response, remote error)
    Network(String),
    /// File I/O errors
    Io(String),
}

impl BlockchainError {
    pub fn connect(addr: &str, reason: impl fmt::Display) -> Self {
        BlockchainError::ConnectFailure {
            addr: addr.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether retrying the same call could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BlockchainError::ConnectFailure { .. } | BlockchainError::Io(_)
        )
    }
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::NotFound(msg) => write!(f, "Not found: {msg}"),
            BlockchainError::OutOfRange { requested, height } => write!(
                f,
                "Height out of range: requested {requested}, chain height {height}"
            ),
            BlockchainError::ConnectFailure { addr, reason } => {
                write!(f, "Failed to reach {addr}: {reason}")
            }
            BlockchainError::VerificationFailure(msg) => write!(f, "Verification failed: {msg}"),
            BlockchainError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Database(msg) => write!(f, "Database error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Network(msg) => write!(f, "Network error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<sled::Error> for BlockchainError {
    fn from(err: sled::Error) -> Self {
        BlockchainError::Database(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for BlockchainError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for BlockchainError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for BlockchainError {
    fn from(err: serde_json::Error) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Configuration(err.to_string())
    }
}
