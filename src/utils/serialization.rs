// Canonical byte encoding: bincode 2.0 with the standard configuration.
// The same bytes are hashed, signed and sent over the wire.
use crate::error::{BlockchainError, Result};

/// Serialize data using bincode 2.0 with standard configuration
pub fn serialize<T: bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    let config = bincode::config::standard();
    bincode::encode_to_vec(data, config)
        .map_err(|e| BlockchainError::Serialization(format!("Serialization failed: {e}")))
}

/// Upper bound on what one decode may claim. Length prefixes beyond it are
/// rejected before anything is allocated.
pub const MAX_DECODE_BYTES: usize = 4 * 1024 * 1024;

/// Deserialize data using bincode 2.0 with standard configuration, bounded
/// by `MAX_DECODE_BYTES`
pub fn deserialize<T: bincode::Decode<()>>(bytes: &[u8]) -> Result<T> {
    let config = bincode::config::standard().with_limit::<MAX_DECODE_BYTES>();
    let (data, read) = bincode::decode_from_slice(bytes, config)
        .map_err(|e| BlockchainError::Serialization(format!("Deserialization failed: {e}")))?;
    if read != bytes.len() {
        return Err(BlockchainError::Serialization(format!(
            "Trailing bytes after payload: {} of {} consumed",
            read,
            bytes.len()
        )));
    }
    Ok(data)
}
