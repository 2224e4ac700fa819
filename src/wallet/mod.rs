//! Node identity
//!
//! Ed25519 key pairs, signatures and the 20-byte addresses derived from
//! public keys.

pub mod keys;

pub use keys::{
    Address, PrivateKey, PublicKey, Signature, ADDRESS_LEN, PUBLIC_KEY_LEN, SEED_LEN,
    SIGNATURE_LEN,
};
