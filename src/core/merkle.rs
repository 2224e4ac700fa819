use crate::core::Transaction;
use crate::error::Result;
use crate::utils::{sha256_digest, Hash, HASH_LEN};

/// Merkle root of a block body, committed to by the header's `tx_root`
pub struct MerkleTree;

impl MerkleTree {
    /// Calculate the Merkle root from a list of transaction hashes.
    ///
    /// An empty body has the all-zero root. A lone leaf and the last leaf
    /// of an odd level are paired with themselves.
    pub fn calculate_merkle_root(transaction_hashes: &[Hash]) -> Hash {
        match transaction_hashes {
            [] => [0u8; HASH_LEN],
            [only] => Self::hash_pair(only, only),
            _ => {
                let mut current_level = transaction_hashes.to_vec();
                while current_level.len() > 1 {
                    current_level = current_level
                        .chunks(2)
                        .map(|pair| {
                            let left = &pair[0];
                            let right = pair.get(1).unwrap_or(left);
                            Self::hash_pair(left, right)
                        })
                        .collect();
                }
                current_level[0]
            }
        }
    }

    /// Merkle root over the canonical hashes of `transactions`
    pub fn root_of(transactions: &[Transaction]) -> Result<Hash> {
        let hashes = transactions
            .iter()
            .map(Transaction::hash)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::calculate_merkle_root(&hashes))
    }

    /// Verify that a list of transactions produces the expected Merkle root
    pub fn verify_transactions(transactions: &[Transaction], expected_root: &Hash) -> Result<bool> {
        Ok(&Self::root_of(transactions)? == expected_root)
    }

    /// Double SHA-256 of the concatenated pair
    fn hash_pair(left: &Hash, right: &Hash) -> Hash {
        let mut combined = Vec::with_capacity(HASH_LEN * 2);
        combined.extend_from_slice(left);
        combined.extend_from_slice(right);
        sha256_digest(&sha256_digest(&combined))
    }
}
