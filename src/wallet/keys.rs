use crate::error::{BlockchainError, Result};
use data_encoding::HEXLOWER;
use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{Ed25519KeyPair, KeyPair, UnparsedPublicKey, ED25519};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Raw ed25519 seed length
pub const SEED_LEN: usize = 32;
pub const PUBLIC_KEY_LEN: usize = 32;
/// Ed25519 signatures are always 64 bytes
pub const SIGNATURE_LEN: usize = 64;
/// Trailing public key bytes that form an address
pub const ADDRESS_LEN: usize = 20;

/// Ed25519 signing key. The seed is wiped when the key is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    seed: [u8; SEED_LEN],
    #[zeroize(skip)]
    key_pair: Ed25519KeyPair,
}

impl PrivateKey {
    /// Fresh key from the system RNG
    pub fn generate() -> Result<PrivateKey> {
        let rng = SystemRandom::new();
        let mut seed = [0u8; SEED_LEN];
        rng.fill(&mut seed)
            .map_err(|_| BlockchainError::Configuration("Failed to gather entropy".to_string()))?;
        let key = Self::from_seed(&seed);
        seed.zeroize();
        key
    }

    /// Rebuild a key from its 32-byte seed. Any other length is a
    /// `Configuration` error.
    pub fn from_seed(seed: &[u8]) -> Result<PrivateKey> {
        if seed.len() != SEED_LEN {
            return Err(BlockchainError::Configuration(format!(
                "Invalid seed length {}, must be {SEED_LEN}",
                seed.len()
            )));
        }
        let key_pair = Ed25519KeyPair::from_seed_unchecked(seed)
            .map_err(|e| BlockchainError::Configuration(format!("Seed rejected: {e}")))?;
        let mut fixed = [0u8; SEED_LEN];
        fixed.copy_from_slice(seed);
        Ok(PrivateKey {
            seed: fixed,
            key_pair,
        })
    }

    /// Seed given as hex, case-insensitive
    pub fn from_hex(s: &str) -> Result<PrivateKey> {
        let mut bytes = HEXLOWER
            .decode(s.trim().to_ascii_lowercase().as_bytes())
            .map_err(|e| BlockchainError::Configuration(format!("Invalid seed hex: {e}")))?;
        let key = Self::from_seed(&bytes);
        bytes.zeroize();
        key
    }

    /// Lowercase hex of the seed, the form `from_hex` and the config accept
    pub fn seed_hex(&self) -> String {
        HEXLOWER.encode(&self.seed)
    }

    pub fn public(&self) -> PublicKey {
        let mut key = [0u8; PUBLIC_KEY_LEN];
        key.copy_from_slice(self.key_pair.public_key().as_ref());
        PublicKey { key }
    }

    /// Sign `msg` as-is; callers pass a digest
    pub fn sign(&self, msg: &[u8]) -> Signature {
        let mut value = [0u8; SIGNATURE_LEN];
        value.copy_from_slice(self.key_pair.sign(msg).as_ref());
        Signature { value }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public", &self.public())
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
/// Ed25519 verifying key
pub struct PublicKey {
    key: [u8; PUBLIC_KEY_LEN],
}

impl PublicKey {
    /// Exactly `PUBLIC_KEY_LEN` bytes, otherwise `Configuration`
    pub fn from_bytes(b: &[u8]) -> Result<PublicKey> {
        let key: [u8; PUBLIC_KEY_LEN] = b.try_into().map_err(|_| {
            BlockchainError::Configuration(format!(
                "Public key length {} not equal to {PUBLIC_KEY_LEN}",
                b.len()
            ))
        })?;
        Ok(PublicKey { key })
    }

    /// The address is the trailing 20 bytes of the key
    pub fn address(&self) -> Address {
        let mut value = [0u8; ADDRESS_LEN];
        value.copy_from_slice(&self.key[PUBLIC_KEY_LEN - ADDRESS_LEN..]);
        Address { value }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", HEXLOWER.encode(&self.key))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&HEXLOWER.encode(&self.key))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
/// Detached ed25519 signature
pub struct Signature {
    value: [u8; SIGNATURE_LEN],
}

impl Signature {
    /// Exactly `SIGNATURE_LEN` bytes, otherwise `Configuration`
    pub fn from_bytes(b: &[u8]) -> Result<Signature> {
        let value: [u8; SIGNATURE_LEN] = b.try_into().map_err(|_| {
            BlockchainError::Configuration(format!(
                "Signature length {} not equal to {SIGNATURE_LEN}",
                b.len()
            ))
        })?;
        Ok(Signature { value })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.value
    }

    /// True if this signature over `msg` was made by `public_key`
    pub fn verify(&self, public_key: &PublicKey, msg: &[u8]) -> bool {
        UnparsedPublicKey::new(&ED25519, public_key.as_bytes())
            .verify(msg, &self.value)
            .is_ok()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", HEXLOWER.encode(&self.value))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
/// 20-byte payment target, shown as lowercase hex
pub struct Address {
    value: [u8; ADDRESS_LEN],
}

impl Address {
    pub fn from_bytes(b: &[u8]) -> Result<Address> {
        let value: [u8; ADDRESS_LEN] = b.try_into().map_err(|_| {
            BlockchainError::Configuration(format!(
                "Address length {} not equal to {ADDRESS_LEN}",
                b.len()
            ))
        })?;
        Ok(Address { value })
    }

    /// Parse the 40-character hex form
    pub fn from_hex(s: &str) -> Result<Address> {
        let bytes = HEXLOWER
            .decode(s.trim().to_ascii_lowercase().as_bytes())
            .map_err(|e| BlockchainError::Configuration(format!("Invalid address hex: {e}")))?;
        Self::from_bytes(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.value
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&HEXLOWER.encode(&self.value))
    }
}
