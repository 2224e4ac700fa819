use crate::core::{MerkleTree, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::{current_timestamp, deserialize, serialize, sha256_digest, Hash, HASH_LEN};
use crate::wallet::{PrivateKey, PublicKey, Signature};
use serde::{Deserialize, Serialize};

pub const BLOCK_VERSION: u32 = 1;

/// Block identity. The block hash is the hash of this header alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Header {
    pub version: u32,
    pub height: u64,
    pub prev_hash: Hash,
    pub tx_root: Hash,
    pub timestamp: i64,
}

impl Header {
    pub fn hash(&self) -> Result<Hash> {
        Ok(sha256_digest(&serialize(self)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
    pub public_key: Option<Vec<u8>>,
    pub signature: Option<Vec<u8>>,
}

impl Block {
    pub fn new(header: Header, transactions: Vec<Transaction>) -> Block {
        Block {
            header,
            transactions,
            public_key: None,
            signature: None,
        }
    }

    /// Build an unsigned block on top of `parent` (or a first block when
    /// `parent` is `None`), committing to `transactions` through `tx_root`.
    pub fn assemble(parent: Option<&Header>, transactions: Vec<Transaction>) -> Result<Block> {
        let (height, prev_hash) = match parent {
            Some(parent) => (parent.height + 1, parent.hash()?),
            None => (0, [0u8; HASH_LEN]),
        };
        let header = Header {
            version: BLOCK_VERSION,
            height,
            prev_hash,
            tx_root: MerkleTree::root_of(&transactions)?,
            timestamp: current_timestamp()?,
        };
        Ok(Block::new(header, transactions))
    }

    pub fn hash(&self) -> Result<Hash> {
        self.header.hash()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize(bytes)
    }
}

/// Sign the header hash and record the signer on the block
pub fn sign_block(key: &PrivateKey, block: &mut Block) -> Result<Signature> {
    let signature = key.sign(&block.hash()?);
    block.public_key = Some(key.public().as_bytes().to_vec());
    block.signature = Some(signature.as_bytes().to_vec());
    Ok(signature)
}

/// Check the seal and that the header commits to the body
pub fn verify_block(block: &Block) -> Result<()> {
    let (raw_key, raw_signature) = match (&block.public_key, &block.signature) {
        (Some(key), Some(signature)) => (key, signature),
        _ => {
            return Err(BlockchainError::VerificationFailure(
                "Block is not signed".to_string(),
            ))
        }
    };
    let public_key = PublicKey::from_bytes(raw_key)
        .map_err(|e| BlockchainError::VerificationFailure(e.to_string()))?;
    let signature = Signature::from_bytes(raw_signature)
        .map_err(|e| BlockchainError::VerificationFailure(e.to_string()))?;

    if !signature.verify(&public_key, &block.hash()?) {
        return Err(BlockchainError::VerificationFailure(
            "Block signature does not match header".to_string(),
        ));
    }
    if !MerkleTree::verify_transactions(&block.transactions, &block.header.tx_root)? {
        return Err(BlockchainError::VerificationFailure(
            "Transaction root does not match block body".to_string(),
        ));
    }
    Ok(())
}
