//! Transaction queue (C4): a FIFO of candidate transactions drained by
//! a single worker into the pool (C5).

use std::collections::{HashSet, VecDeque};

use crate::accounts::AccountRegistry;
use crate::dispatch::Dispatcher;
use crate::mempool::pool::TransactionPool;
use crate::types::{Transaction, TransactionId};

/// FIFO candidate queue. `drain_one` implements the single-worker
/// pipeline: verify structure, reject duplicates already staged
/// elsewhere, resolve (or stub) the sender, verify against unconfirmed
/// state, and on success hand off to the pool.
#[derive(Default)]
pub struct TransactionQueue {
    entries: VecDeque<Transaction>,
    queued_ids: HashSet<TransactionId>,
}

impl TransactionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tx: Transaction) {
        if self.queued_ids.insert(tx.id) {
            self.entries.push_back(tx);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drains and processes a single queued transaction, if any,
    /// pushing it into `pool` on success. Returns `true` if a
    /// transaction was processed (successfully or not).
    pub fn drain_one(&mut self, pool: &mut TransactionPool, accounts: &mut AccountRegistry) -> bool {
        let Some(tx) = self.entries.pop_front() else {
            return false;
        };
        self.queued_ids.remove(&tx.id);

        if pool.contains(&tx.id) {
            tracing::debug!(tx_id = %tx.id.to_hex(), "dropping duplicate queued transaction already in pool");
            return true;
        }

        if let Err(e) = Dispatcher::verify(&tx) {
            tracing::warn!(tx_id = %tx.id.to_hex(), error = %e, "dropping transaction: verify failed");
            return true;
        }

        let sender_address = tx.sender_address;
        accounts.add(sender_address, Some(tx.sender_public_key));
        let sender = accounts
            .get_by_address(&sender_address)
            .expect("just inserted")
            .clone();

        if let Err(e) = Dispatcher::verify_unconfirmed(&tx, &sender) {
            tracing::warn!(tx_id = %tx.id.to_hex(), error = %e, "dropping transaction: verify_unconfirmed failed");
            return true;
        }

        if !Dispatcher::ready(&tx, &sender) {
            tracing::warn!(tx_id = %tx.id.to_hex(), "dropping transaction: multisig quorum not satisfied");
            return true;
        }

        pool.push(tx, accounts, false);
        true
    }

    /// Drains every currently-queued transaction.
    pub fn drain_all(&mut self, pool: &mut TransactionPool, accounts: &mut AccountRegistry) {
        while self.drain_one(pool, accounts) {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tx::{Asset, TransactionStatus, TxSend};
    use crate::types::{Address, Hash256, PublicKey, Signature, HASH_LEN, SIGNATURE_LEN};

    fn unsigned_send_tx(id_byte: u8, amount: u64) -> Transaction {
        Transaction {
            id: Hash256([id_byte; HASH_LEN]),
            sender_public_key: PublicKey([1u8; 32]),
            sender_address: Address(1),
            recipient_address: Some(Address(2)),
            amount,
            fee: 1,
            created_at: 0,
            signature: Signature([0u8; SIGNATURE_LEN]),
            second_signature: None,
            asset: Asset::Send(TxSend { amount }),
            block_id: None,
            status: TransactionStatus::Created,
        }
    }

    #[test]
    fn push_deduplicates_by_id() {
        let mut queue = TransactionQueue::new();
        queue.push(unsigned_send_tx(1, 10));
        queue.push(unsigned_send_tx(1, 10));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn drain_one_drops_transactions_that_fail_verify() {
        // The signature is all-zero and won't verify against the
        // public key, so this transaction must be dropped, not queued.
        let mut queue = TransactionQueue::new();
        let mut pool = TransactionPool::new();
        let mut accounts = AccountRegistry::new();
        queue.push(unsigned_send_tx(1, 10));

        let processed = queue.drain_one(&mut pool, &mut accounts);
        assert!(processed);
        assert!(queue.is_empty());
        assert_eq!(pool.len(), 0);
    }
}
