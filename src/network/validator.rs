use crate::core::{sign_block, Block, Transaction};
use crate::error::{BlockchainError, Result};
use crate::network::Node;
use crate::utils::Hash;
use data_encoding::HEXLOWER;
use log::{debug, error, info};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Weak};
use std::thread;

/// What a validator does on each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidatorMode {
    /// Log the pending count and drop every pending transaction. No block
    /// is built.
    #[default]
    Stub,
    /// Seal pending transactions into a signed block on the current head
    ProduceBlocks,
}

impl Node {
    /// Run one validator tick by hand. Returns the block appended, if any.
    pub fn validator_tick(&self) -> Result<Option<Block>> {
        let key = self.require_key()?;
        match self.validator_mode {
            ValidatorMode::Stub => {
                info!(
                    "[{}] creating new block with {} transactions",
                    self.listen_addr(),
                    self.mempool.len()
                );
                self.mempool.clear()?;
                Ok(None)
            }
            ValidatorMode::ProduceBlocks => {
                let (hashes, transactions) = self.pending_by_hash()?;
                if transactions.is_empty() {
                    debug!("[{}] nothing to seal", self.listen_addr());
                    return Ok(None);
                }

                let head = self.chain.head()?;
                let mut block = Block::assemble(head.as_ref(), transactions)?;
                sign_block(key, &mut block)?;
                self.chain.add_block(&block)?;
                let removed = self.mempool.remove_many(&hashes)?;

                info!(
                    "[{}] sealed block {} at height {} with {removed} transactions",
                    self.listen_addr(),
                    HEXLOWER.encode(&block.hash()?),
                    block.header.height
                );
                Ok(Some(block))
            }
        }
    }

    pub(super) fn spawn_validator(self: &Arc<Self>) -> Result<()> {
        let (sender, receiver) = mpsc::channel::<()>();
        {
            let mut slot = self.shutdown.lock().map_err(|e| {
                BlockchainError::Network(format!("Failed to acquire validator lock: {e}"))
            })?;
            if slot.is_some() {
                return Ok(());
            }
            *slot = Some(sender);
        }

        let node: Weak<Node> = Arc::downgrade(self);
        let block_time = self.config.block_time();
        info!(
            "[{}] starting validator ({:?}), block time {block_time:?}",
            self.listen_addr(),
            self.validator_mode
        );

        thread::spawn(move || loop {
            match receiver.recv_timeout(block_time) {
                Err(RecvTimeoutError::Timeout) => {
                    let Some(node) = node.upgrade() else { break };
                    if let Err(e) = node.validator_tick() {
                        error!("[{}] validator tick failed: {e}", node.listen_addr());
                    }
                }
                // Sender dropped or signalled
                _ => break,
            }
        });
        Ok(())
    }

    /// Pending transactions in hash order, paired with their hashes
    fn pending_by_hash(&self) -> Result<(Vec<Hash>, Vec<Transaction>)> {
        let mut entries = self
            .mempool
            .pending()?
            .into_iter()
            .map(|tx| tx.hash().map(|hash| (hash, tx)))
            .collect::<Result<Vec<_>>>()?;
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries.into_iter().unzip())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use crate::core::{verify_block, TxInput, TxOutput};
    use crate::network::LocalNetwork;
    use crate::wallet::PrivateKey;
    use std::time::Duration;

    fn signed_tx(amount: u64) -> Transaction {
        let key = PrivateKey::generate().unwrap();
        let mut tx = Transaction::new(
            1,
            vec![TxInput::new(&[5u8; 32], 0, &key.public())],
            vec![TxOutput::new(amount, &key.public().address())],
        );
        tx.sign_inputs(&key).unwrap();
        tx
    }

    fn validator(produce: bool) -> Arc<Node> {
        let seed = PrivateKey::generate().unwrap().seed_hex();
        let config = NodeConfig {
            private_key: Some(seed),
            block_production: produce,
            // Long enough that only manual ticks run in these tests
            block_time_ms: 60_000,
            ..NodeConfig::new("v1")
        };
        LocalNetwork::new().spawn_node(config).unwrap()
    }

    #[test]
    fn test_tick_requires_key() {
        let node = LocalNetwork::new().spawn_node(NodeConfig::new("n1")).unwrap();
        assert!(matches!(
            node.validator_tick(),
            Err(BlockchainError::Configuration(_))
        ));
    }

    #[test]
    fn test_stub_tick_clears_without_block() {
        let node = validator(false);
        node.submit_transaction(signed_tx(1)).unwrap();
        node.submit_transaction(signed_tx(2)).unwrap();

        assert!(node.validator_tick().unwrap().is_none());
        assert!(node.mempool().is_empty());
        assert_eq!(node.chain().height(), -1);
    }

    #[test]
    fn test_produce_tick_seals_pending() {
        let node = validator(true);
        node.submit_transaction(signed_tx(1)).unwrap();
        node.submit_transaction(signed_tx(2)).unwrap();

        let block = node.validator_tick().unwrap().unwrap();
        assert_eq!(block.transactions.len(), 2);
        assert!(verify_block(&block).is_ok());
        assert_eq!(node.chain().height(), 0);
        assert_eq!(node.chain().get_block_by_height(0).unwrap(), block);
        assert!(node.mempool().is_empty());

        // Empty mempool, no block
        assert!(node.validator_tick().unwrap().is_none());

        node.submit_transaction(signed_tx(3)).unwrap();
        let next = node.validator_tick().unwrap().unwrap();
        assert_eq!(next.header.height, 1);
        assert_eq!(next.header.prev_hash, block.hash().unwrap());
    }

    #[test]
    fn test_timer_drives_ticks_until_shutdown() {
        let seed = PrivateKey::generate().unwrap().seed_hex();
        let config = NodeConfig {
            private_key: Some(seed),
            block_time_ms: 20,
            ..NodeConfig::new("v2")
        };
        let node = LocalNetwork::new().spawn_node(config).unwrap();
        node.submit_transaction(signed_tx(9)).unwrap();

        let mut cleared = false;
        for _ in 0..100 {
            if node.mempool().is_empty() {
                cleared = true;
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert!(cleared);
        node.shutdown();
    }
}
