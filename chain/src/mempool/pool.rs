//! Transaction pool (C5): the indexed, unconfirmed-state-carrying tier
//! of the mempool.

use std::collections::HashMap;

use crate::accounts::AccountRegistry;
use crate::dispatch::Dispatcher;
use crate::types::tx::{transaction_sort_func, Asset, TransactionKind};
use crate::types::{Address, Transaction, TransactionId};

/// Recipient-side addresses that `trs` should be indexed under, per the
/// per-type indexing rules: direct recipient for SEND; every airdrop
/// sponsor for VOTE (when `reward` or `unstake`) and for every STAKE.
fn recipient_index_targets(tx: &Transaction) -> Vec<Address> {
    match &tx.asset {
        Asset::Send(_) => tx.recipient_address.into_iter().collect(),
        Asset::Vote(v) if v.reward || v.unstake => v.airdrop_sponsors.clone(),
        Asset::Stake(s) => s.airdrop_sponsors.clone(),
        _ => Vec::new(),
    }
}

/// Indexed transaction pool, carrying unconfirmed state in step with
/// every staged transaction.
#[derive(Default)]
pub struct TransactionPool {
    pool: HashMap<TransactionId, Transaction>,
    pool_by_sender: HashMap<Address, Vec<TransactionId>>,
    pool_by_recipient: HashMap<Address, Vec<TransactionId>>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn contains(&self, id: &TransactionId) -> bool {
        self.pool.contains_key(id)
    }

    pub fn get(&self, id: &TransactionId) -> Option<&Transaction> {
        self.pool.get(id)
    }

    fn index_insert(&mut self, tx: &Transaction) {
        self.pool_by_sender
            .entry(tx.sender_address)
            .or_default()
            .push(tx.id);
        for addr in recipient_index_targets(tx) {
            self.pool_by_recipient.entry(addr).or_default().push(tx.id);
        }
    }

    fn index_remove(&mut self, tx: &Transaction) {
        if let Some(ids) = self.pool_by_sender.get_mut(&tx.sender_address) {
            ids.retain(|id| id != &tx.id);
        }
        for addr in recipient_index_targets(tx) {
            if let Some(ids) = self.pool_by_recipient.get_mut(&addr) {
                ids.retain(|id| id != &tx.id);
            }
        }
    }

    /// Rejects duplicates; inserts into all three maps; applies
    /// unconfirmed state against the sender account. `broadcast` is a
    /// hook for the caller to relay via the sync/event layer (C8/C9);
    /// this pool does not itself reach out to those subsystems.
    pub fn push(&mut self, tx: Transaction, accounts: &mut AccountRegistry, broadcast: bool) -> bool {
        if self.pool.contains_key(&tx.id) {
            return false;
        }

        let sender_address = tx.sender_address;
        accounts.add(sender_address, Some(tx.sender_public_key));
        if let Some(sender) = accounts.get_by_address_mut(&sender_address) {
            Dispatcher::apply_unconfirmed(&tx, sender);
        }

        self.index_insert(&tx);
        if broadcast {
            tracing::debug!(tx_id = %tx.id.to_hex(), "relaying transaction to peers");
        }
        self.pool.insert(tx.id, tx);
        true
    }

    /// Undoes unconfirmed state and removes `id` from all three maps.
    /// Returns the removed transaction, if it was present.
    pub fn remove(&mut self, id: &TransactionId, accounts: &mut AccountRegistry) -> Option<Transaction> {
        let tx = self.pool.remove(id)?;
        if let Some(sender) = accounts.get_by_address_mut(&tx.sender_address) {
            Dispatcher::undo_unconfirmed(&tx, sender);
        }
        self.index_remove(&tx);
        Some(tx)
    }

    /// Removes, for each input transaction, every pool entry sharing
    /// its sender address (an over-approximation of the transitive
    /// closure of sender-entangled entries), used when a block is
    /// received. Returns all removed transactions.
    pub fn batch_remove(&mut self, txs: &[Transaction], accounts: &mut AccountRegistry) -> Vec<Transaction> {
        let senders: std::collections::HashSet<Address> = txs.iter().map(|t| t.sender_address).collect();
        let mut to_remove = Vec::new();
        for sender in &senders {
            if let Some(ids) = self.pool_by_sender.get(sender) {
                to_remove.extend(ids.iter().copied());
            }
        }
        to_remove
            .into_iter()
            .filter_map(|id| self.remove(&id, accounts))
            .collect()
    }

    /// Pops up to `limit` transactions in ascending `transactionSortFunc`
    /// order; the underlying removals happen in reverse of that order so
    /// `undo_unconfirmed` sequencing preserves invariants.
    pub fn pop_sorted_unconfirmed_transactions(
        &mut self,
        limit: usize,
        accounts: &mut AccountRegistry,
    ) -> Vec<Transaction> {
        let mut sorted: Vec<Transaction> = self.pool.values().cloned().collect();
        sorted.sort_by(transaction_sort_func);
        sorted.truncate(limit);

        for tx in sorted.iter().rev() {
            self.remove(&tx.id, accounts);
        }
        sorted
    }

    /// Returns conflicting staged pool entries back via `push` rather
    /// than directly re-inserting, honoring the "returnToQueueConflicted"
    /// path used after a failed block generation: callers should prefer
    /// feeding these back through the queue so conflicts are
    /// re-evaluated against current state.
    pub fn is_potential_conflict(&self, tx: &Transaction) -> bool {
        let dependents = self
            .pool_by_sender
            .get(&tx.sender_address)
            .map(|ids| ids.iter().filter_map(|id| self.pool.get(id)).collect::<Vec<_>>())
            .unwrap_or_default();

        match tx.kind() {
            TransactionKind::Signature => !dependents.is_empty(),
            TransactionKind::Register => dependents
                .iter()
                .any(|d| d.kind() == TransactionKind::Register),
            _ => {
                if dependents.is_empty() {
                    return false;
                }
                let mut candidate: Vec<&Transaction> = dependents.clone();
                candidate.push(tx);
                candidate.sort_by(|a, b| transaction_sort_func(a, b));
                candidate.last().map(|t| t.id) != Some(tx.id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::tx::{TransactionStatus, TxSend, TxSignature};
    use crate::types::{Hash256, PublicKey, Signature, HASH_LEN, SIGNATURE_LEN};

    fn send_tx(id_byte: u8, sender: Address, recipient: Address, amount: u64) -> Transaction {
        Transaction {
            id: Hash256([id_byte; HASH_LEN]),
            sender_public_key: PublicKey([1u8; 32]),
            sender_address: sender,
            recipient_address: Some(recipient),
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

    fn signature_tx(id_byte: u8, sender: Address) -> Transaction {
        Transaction {
            id: Hash256([id_byte; HASH_LEN]),
            sender_public_key: PublicKey([1u8; 32]),
            sender_address: sender,
            recipient_address: None,
            amount: 0,
            fee: 1,
            created_at: 0,
            signature: Signature([0u8; SIGNATURE_LEN]),
            second_signature: None,
            asset: Asset::Signature(TxSignature {
                second_public_key: PublicKey([2u8; 32]),
            }),
            block_id: None,
            status: TransactionStatus::Created,
        }
    }

    #[test]
    fn push_then_remove_restores_u_balance_bit_exact() {
        let mut pool = TransactionPool::new();
        let mut accounts = AccountRegistry::new();
        accounts.add(Address(1), Some(PublicKey([1u8; 32])));
        accounts.get_by_address_mut(&Address(1)).unwrap().u_balance = 1_000;

        let tx = send_tx(1, Address(1), Address(2), 100);
        pool.push(tx.clone(), &mut accounts, false);
        assert_eq!(accounts.get_by_address(&Address(1)).unwrap().u_balance, 899);

        pool.remove(&tx.id, &mut accounts);
        assert_eq!(accounts.get_by_address(&Address(1)).unwrap().u_balance, 1_000);
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn mempool_conflict_scenario_signature_after_send() {
        let mut pool = TransactionPool::new();
        let mut accounts = AccountRegistry::new();
        accounts.add(Address(1), Some(PublicKey([1u8; 32])));
        accounts.get_by_address_mut(&Address(1)).unwrap().u_balance = 1_000;

        let tx1 = send_tx(1, Address(1), Address(2), 100);
        pool.push(tx1, &mut accounts, false);

        let tx2 = signature_tx(2, Address(1));
        assert!(pool.is_potential_conflict(&tx2));
    }

    #[test]
    fn pop_sorted_returns_ascending_order() {
        let mut pool = TransactionPool::new();
        let mut accounts = AccountRegistry::new();
        accounts.add(Address(1), Some(PublicKey([1u8; 32])));
        accounts.get_by_address_mut(&Address(1)).unwrap().u_balance = 10_000;

        pool.push(send_tx(2, Address(1), Address(9), 1), &mut accounts, false);
        pool.push(send_tx(1, Address(1), Address(9), 1), &mut accounts, false);

        let popped = pool.pop_sorted_unconfirmed_transactions(10, &mut accounts);
        assert_eq!(popped.len(), 2);
        assert!(popped[0].id.as_bytes() < popped[1].id.as_bytes());
        assert_eq!(pool.len(), 0);
    }
}
