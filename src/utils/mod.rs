//! Utility functions and helpers
//!
//! Hashing, timestamps and the canonical byte encoding shared by every
//! hashed or signed structure.

pub mod crypto;
pub mod serialization;

pub use crypto::{current_timestamp, sha256_digest, Hash, HASH_LEN};
pub use serialization::{deserialize, serialize, MAX_DECODE_BYTES};
