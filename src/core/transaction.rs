// Transactions reference previous outputs by (hash, index) and pay amounts
// to 20-byte addresses. Signatures are never part of the bytes they sign.

use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize, sha256_digest, Hash};
use crate::wallet::{Address, PrivateKey, PublicKey, Signature};
use serde::{Deserialize, Serialize};

/// Spends output `prev_out_index` of transaction `prev_tx_hash`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TxInput {
    pub prev_tx_hash: Vec<u8>,
    pub prev_out_index: u32,
    pub public_key: Vec<u8>,
    pub signature: Option<Vec<u8>>,
}

impl TxInput {
    /// An unsigned input spendable by `public_key`
    pub fn new(prev_tx_hash: &[u8], prev_out_index: u32, public_key: &PublicKey) -> TxInput {
        TxInput {
            prev_tx_hash: prev_tx_hash.to_vec(),
            prev_out_index,
            public_key: public_key.as_bytes().to_vec(),
            signature: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TxOutput {
    pub amount: u64,
    pub address: Vec<u8>,
}

impl TxOutput {
    pub fn new(amount: u64, address: &Address) -> TxOutput {
        TxOutput {
            amount,
            address: address.as_bytes().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    pub fn new(version: u32, inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Transaction {
        Transaction {
            version,
            inputs,
            outputs,
        }
    }

    /// Canonical hash of the full transaction, signatures included.
    /// This is the mempool identity.
    pub fn hash(&self) -> Result<Hash> {
        Ok(sha256_digest(&self.serialize()?))
    }

    /// Hash of the transaction with every input signature cleared.
    /// Both signing and verification use this digest.
    pub fn signing_hash(&self) -> Result<Hash> {
        self.stripped_copy().hash()
    }

    /// Sign once and attach the signature to every input owned by `key`.
    /// Returns how many inputs were signed.
    pub fn sign_inputs(&mut self, key: &PrivateKey) -> Result<usize> {
        let signature = sign_transaction(key, self)?;
        let public = key.public();
        let mut signed = 0;
        for input in self
            .inputs
            .iter_mut()
            .filter(|input| input.public_key == public.as_bytes())
        {
            input.signature = Some(signature.as_bytes().to_vec());
            signed += 1;
        }
        Ok(signed)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize(bytes)
    }

    pub fn total_output(&self) -> Result<u64> {
        self.outputs.iter().try_fold(0u64, |total, output| {
            total
                .checked_add(output.amount)
                .ok_or_else(|| BlockchainError::VerificationFailure("Output value overflow".to_string()))
        })
    }

    fn stripped_copy(&self) -> Transaction {
        let mut copy = self.clone();
        for input in &mut copy.inputs {
            input.signature = None;
        }
        copy
    }
}

/// Hash the signature-stripped transaction and sign the digest
pub fn sign_transaction(key: &PrivateKey, tx: &Transaction) -> Result<Signature> {
    Ok(key.sign(&tx.signing_hash()?))
}

/// Every input must carry a valid signature by its claimed public key over
/// the signature-stripped digest. The transaction itself is left untouched.
pub fn verify_transaction(tx: &Transaction) -> Result<()> {
    if tx.outputs.is_empty() {
        return Err(BlockchainError::VerificationFailure(
            "Transaction has no outputs".to_string(),
        ));
    }
    tx.total_output()?;

    let digest = tx.signing_hash()?;
    for (idx, input) in tx.inputs.iter().enumerate() {
        let raw_signature = input.signature.as_deref().ok_or_else(|| {
            BlockchainError::VerificationFailure(format!("Input {idx} is not signed"))
        })?;
        let public_key = PublicKey::from_bytes(&input.public_key).map_err(|e| {
            BlockchainError::VerificationFailure(format!("Input {idx} public key: {e}"))
        })?;
        let signature = Signature::from_bytes(raw_signature).map_err(|e| {
            BlockchainError::VerificationFailure(format!("Input {idx} signature: {e}"))
        })?;

        if !signature.verify(&public_key, &digest) {
            return Err(BlockchainError::VerificationFailure(format!(
                "Input {idx} signature does not match public key {public_key}"
            )));
        }
    }
    Ok(())
}
