//! The consensus engine (C7): block creation, verification, processing,
//! receipt/fork resolution, generation and rollback.
//!
//! One `ConsensusEngine` owns every piece of mutable node state that
//! block processing touches: the account registry (C2), the two-tier
//! mempool (C4/C5), the in-memory block window plus the durable
//! repository (C6), and the current round (C1). It is generic over the
//! repository and sync implementations so tests can run entirely
//! in-memory.

use std::collections::HashSet;
use std::sync::Arc;

use ed25519_dalek::SigningKey;

use crate::accounts::AccountRegistry;
use crate::config::ChainConfig;
use crate::dispatch::Dispatcher;
use crate::error::{ChainError, ProcessResult};
use crate::mempool::{TransactionPool, TransactionQueue};
use crate::metrics::ConsensusMetrics;
use crate::slots::SlotService;
use crate::storage::{BlockRepository, BlockWindow};
use crate::types::block::genesis_skeleton;
use crate::types::tx::{transaction_sort_func, Asset as TxAsset};
use crate::types::{
    Block, Delegate, Hash256, PublicKey, Round, Signature, Transaction, TransactionKind, HASH_LEN,
    SIGNATURE_LEN,
};

use super::events::{Event, EventBus};
use super::sync::SyncHandle;
use super::{fork, validate};

/// The consensus engine, parameterized over its durable repository `R`
/// and its sync-layer handle `S`.
pub struct ConsensusEngine<R: BlockRepository, S: SyncHandle> {
    config: ChainConfig,
    slots: SlotService,
    accounts: AccountRegistry,
    queue: TransactionQueue,
    pool: TransactionPool,
    window: BlockWindow,
    repo: R,
    sync: S,
    events: EventBus,
    metrics: Option<Arc<ConsensusMetrics>>,
    round: Option<Round>,
    active_delegates: Vec<PublicKey>,
}

impl<R: BlockRepository, S: SyncHandle> ConsensusEngine<R, S> {
    /// Builds an engine over an already-open repository, rehydrating the
    /// in-memory window from the last `max_block_in_memory` durable
    /// blocks.
    pub fn new(config: ChainConfig, repo: R, sync: S) -> Result<Self, ChainError> {
        let capacity = config.max_block_in_memory;
        let slots = SlotService::new(&config);
        let recent = repo
            .load_last_n_blocks(capacity)
            .map_err(|e| ChainError::Storage(e.to_string()))?;
        let window = BlockWindow::from_blocks(capacity, recent);

        Ok(Self {
            config,
            slots,
            accounts: AccountRegistry::new(),
            queue: TransactionQueue::new(),
            pool: TransactionPool::new(),
            window,
            repo,
            sync,
            events: EventBus::default(),
            metrics: None,
            round: None,
            active_delegates: Vec::new(),
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<ConsensusMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn accounts(&self) -> &AccountRegistry {
        &self.accounts
    }

    pub fn accounts_mut(&mut self) -> &mut AccountRegistry {
        &mut self.accounts
    }

    pub fn pool(&self) -> &TransactionPool {
        &self.pool
    }

    pub fn queue(&mut self) -> &mut TransactionQueue {
        &mut self.queue
    }

    pub fn last_block(&self) -> Option<&Block> {
        self.window.last()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Replaces the active delegate set used to (re)generate rounds, as
    /// decided by whatever vote-tallying/ranking process produces it
    /// (out of scope here, per spec §1).
    pub fn set_active_delegates(&mut self, delegates: Vec<PublicKey>) {
        self.active_delegates = delegates;
    }

    fn record_rejection(&self, reason: &'static str) {
        if let Some(metrics) = &self.metrics {
            metrics.blocks_rejected_total.with_label_values(&[reason]).inc();
        }
    }

    /// Regenerates `self.round` if it no longer covers the slot at
    /// `reference_unix_time`. A no-op while no active delegate set has
    /// been configured.
    fn ensure_round_for_time(&mut self, reference_unix_time: i64) {
        let current_slot = self.slots.get_slot_number(reference_unix_time);
        let covers = self.round.as_ref().is_some_and(|r| {
            let n = self.config.active_delegates_count as i64;
            current_slot >= r.start_height as i64 && current_slot < r.start_height as i64 + n
        });
        if !covers && !self.active_delegates.is_empty() {
            let first_slot = self.slots.get_first_slot_number_in_round(current_slot);
            self.round = Some(self.slots.generate(first_slot, &self.active_delegates));
        }
    }

    /// Builds and signs a block carrying `transactions` on top of
    /// `previous_block` (spec §4.7.2).
    pub fn create(
        &self,
        mut transactions: Vec<Transaction>,
        created_at: i32,
        previous_block: &Block,
        signing_key: &SigningKey,
    ) -> Block {
        transactions.sort_by(transaction_sort_func);
        let mut block = Block {
            id: Hash256([0u8; HASH_LEN]),
            version: self.config.current_block_version,
            height: previous_block.height + 1,
            previous_block_id: Some(previous_block.id),
            created_at,
            generator_public_key: PublicKey(signing_key.verifying_key().to_bytes()),
            signature: Signature([0u8; SIGNATURE_LEN]),
            payload_hash: Hash256([0u8; HASH_LEN]),
            transaction_count: transactions.len() as u32,
            amount: 0,
            fee: 0,
            transactions,
        };
        self.add_payload_hash(&mut block, signing_key);
        block
    }

    /// Recomputes `amount`/`fee`/`transactionCount`/`payloadHash`, signs
    /// over the signing hash, recomputes `id`, and stamps every
    /// transaction's `blockId` (spec §4.7.2).
    pub fn add_payload_hash(&self, block: &mut Block, signing_key: &SigningKey) {
        let mut hasher = crate::types::StreamingHasher::new();
        let mut amount = 0u64;
        let mut fee = 0u64;
        for tx in &block.transactions {
            amount += tx.asset.send_amount();
            fee += tx.fee;
            hasher.update(&tx.canonical_bytes());
        }
        block.amount = amount;
        block.fee = fee;
        block.transaction_count = block.transactions.len() as u32;
        block.payload_hash = hasher.finalize();

        let signing_hash = block.signing_hash();
        let signature = signing_key.sign(signing_hash.as_bytes());
        block.signature = Signature(signature.to_bytes());
        block.id = block.compute_id();

        let block_id = block.id;
        for tx in block.transactions.iter_mut() {
            tx.block_id = Some(block_id);
        }
    }

    /// Structural + slot verification of `block` (spec §4.7.3/§4.7.4).
    fn verify(&self, block: &Block, now_unix: i64, check_signature_and_id: bool) -> Vec<String> {
        let previous = self.window.last();
        let mut errors = validate::verify_block(block, previous, &self.config, now_unix, check_signature_and_id);

        match &self.round {
            Some(round) => {
                if let Err(e) = validate::verify_block_slot(block, round, &self.slots) {
                    errors.push(e.to_string());
                }
            }
            None => errors.push("no active round to verify block slot against".to_string()),
        }
        errors
    }

    /// Applies every transaction's unconfirmed effects against the
    /// (possibly just-learned) sender accounts, rolling back in LIFO
    /// order if any transaction fails verification (spec §4.7.7 step 3).
    fn check_transactions_and_apply_unconfirmed(
        &mut self,
        block: &mut Block,
        verify: bool,
    ) -> Result<(), Vec<String>> {
        let mut applied_indices: Vec<usize> = Vec::new();

        for i in 0..block.transactions.len() {
            let sender_addr = block.transactions[i].sender_address;
            let sender_pk = block.transactions[i].sender_public_key;
            self.accounts.add(sender_addr, Some(sender_pk));

            // Username uniqueness is a registry-wide invariant the
            // per-type handler can't see (it only gets the sender
            // account), so it's checked here unconditionally rather
            // than folded into `verify_unconfirmed`.
            if let TxAsset::Delegate(d) = &block.transactions[i].asset {
                if self.accounts.delegate_username_taken(&d.username) {
                    for &j in applied_indices.iter().rev() {
                        let addr = block.transactions[j].sender_address;
                        if let Some(sender) = self.accounts.get_by_address_mut(&addr) {
                            Dispatcher::undo_unconfirmed(&block.transactions[j], sender);
                        }
                    }
                    return Err(vec![format!("delegate username '{}' already taken", d.username)]);
                }
            }

            if verify {
                let snapshot = self
                    .accounts
                    .get_by_address(&sender_addr)
                    .expect("just inserted")
                    .clone();
                if let Err(e) = Dispatcher::verify_unconfirmed(&block.transactions[i], &snapshot) {
                    for &j in applied_indices.iter().rev() {
                        let addr = block.transactions[j].sender_address;
                        if let Some(sender) = self.accounts.get_by_address_mut(&addr) {
                            Dispatcher::undo_unconfirmed(&block.transactions[j], sender);
                        }
                    }
                    return Err(vec![e.to_string()]);
                }
                if !Dispatcher::ready(&block.transactions[i], &snapshot) {
                    for &j in applied_indices.iter().rev() {
                        let addr = block.transactions[j].sender_address;
                        if let Some(sender) = self.accounts.get_by_address_mut(&addr) {
                            Dispatcher::undo_unconfirmed(&block.transactions[j], sender);
                        }
                    }
                    return Err(vec![ChainError::MultisigNotReady.to_string()]);
                }
            } else if block.transactions[i].kind() == TransactionKind::Vote {
                if let Some(sender) = self.accounts.get_by_address(&sender_addr) {
                    block.transactions[i].fee =
                        Dispatcher::calculate_fee(&block.transactions[i], sender, &self.config);
                }
            }

            if let Some(sender) = self.accounts.get_by_address_mut(&sender_addr) {
                Dispatcher::apply_unconfirmed(&block.transactions[i], sender);
            }
            applied_indices.push(i);
        }

        Ok(())
    }

    /// Persists `block`, applies its confirmed effects, advances round
    /// bookkeeping, and broadcasts (spec §4.7.7 step 4).
    fn apply_block(&mut self, mut block: Block, signing_key: Option<&SigningKey>, broadcast: bool) -> Result<(), ChainError> {
        if let Some(sk) = signing_key {
            self.add_payload_hash(&mut block, sk);
        }

        self.repo
            .batch_save(&block)
            .map_err(|e| ChainError::Storage(e.to_string()))?;
        // A failure here does not roll back the unconfirmed state already
        // applied above; see the open question recorded in DESIGN.md.

        self.window.push(block.clone());

        for tx in &block.transactions {
            if let Some(sender) = self.accounts.get_by_address_mut(&tx.sender_address) {
                Dispatcher::apply(tx, sender);
            }
            if let TxAsset::Delegate(d) = &tx.asset {
                if let Ok(delegate) = Delegate::new(d.username.clone(), tx.sender_public_key) {
                    self.accounts.attach_delegate(tx.sender_address, Some(delegate));
                }
            }
        }

        if block.height >= self.config.min_round_block_height {
            self.ensure_round_for_time(self.slots.get_slot_time(self.slots.get_slot_number(block.created_at as i64)));
            if let Some(round) = &mut self.round {
                round.mark_forged(&block.generator_public_key);
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.blocks_applied_total.inc();
        }

        if broadcast && !self.sync.syncing() {
            self.events.emit(Event::ApplyBlock(block.clone()));
            self.sync.broadcast_block(&block);
        }

        Ok(())
    }

    /// The shared verify -> duplicate-check -> apply-unconfirmed ->
    /// apply pipeline (spec §4.7.7).
    pub fn process(
        &mut self,
        mut block: Block,
        broadcast: bool,
        signing_key: Option<&SigningKey>,
        verify: bool,
        now_unix: i64,
    ) -> ProcessResult {
        let mut result = ProcessResult::ok();

        if verify {
            let errors = self.verify(&block, now_unix, true);
            if !errors.is_empty() {
                self.record_rejection("structural");
                result.errors = errors;
                return result;
            }
        }

        if self.window.has(&block.id) {
            self.record_rejection("already_processed");
            result.push(ChainError::BlockAlreadyProcessed(block.id.to_hex()));
            return result;
        }

        if let Err(errs) = self.check_transactions_and_apply_unconfirmed(&mut block, verify) {
            self.record_rejection("transaction");
            result.errors = errs;
            return result;
        }

        if let Err(e) = self.apply_block(block, signing_key, broadcast) {
            self.record_rejection("apply");
            result.push(e);
        }

        result
    }

    /// Receives a block from a peer, resolving forks per the decision
    /// tree in spec §4.7.5.
    pub fn receive_block(&mut self, received: Block, now_unix: i64, own_consensus: bool) -> ProcessResult {
        let mut result = ProcessResult::ok();

        if self.sync.syncing() {
            tracing::debug!(block_id = %received.id.to_hex(), "dropping received block: node is syncing");
            result.push(ChainError::Other("dropped: syncing".into()));
            return result;
        }

        let Some(local_last) = self.window.last().cloned() else {
            result.push(ChainError::Other("no local chain tip to compare against".into()));
            return result;
        };

        tracing::info!(block_id = %received.id.to_hex(), height = received.height, "received block");

        match validate::validate_received_block(&received, &local_last, own_consensus) {
            validate::ReceiveDecision::Reject(reason) => {
                self.record_rejection("receive_policy");
                result.push(ChainError::Other(reason));
                result
            }
            validate::ReceiveDecision::TriggerSync => {
                tracing::warn!(block_id = %received.id.to_hex(), "received block height ahead of local chain, requesting sync");
                self.events.emit(Event::EmitSyncBlocks);
                self.sync.request_blocks_from(local_last.height + 1);
                result.push(ChainError::Other("height ahead of local chain, sync requested".into()));
                result
            }
            validate::ReceiveDecision::ForkCauseOne => {
                if let Some(metrics) = &self.metrics {
                    metrics.fork_events_total.with_label_values(&["one"]).inc();
                }
                match fork::fork_cause_one(&received, &local_last) {
                    fork::ForkOneOutcome::DiscardReceived => {
                        tracing::warn!(
                            received_id = %received.id.to_hex(),
                            local_id = %local_last.id.to_hex(),
                            "fork cause 1: discarding received block"
                        );
                        result.push(ChainError::Other("fork cause 1: received block discarded".into()));
                        result
                    }
                    fork::ForkOneOutcome::RollBackLocal => {
                        let pre_errors = self.verify(&received, now_unix, true);
                        if !pre_errors.is_empty() {
                            result.errors = pre_errors;
                            return result;
                        }
                        tracing::warn!(
                            received_id = %received.id.to_hex(),
                            local_id = %local_last.id.to_hex(),
                            "fork cause 1: rolling back local chain"
                        );
                        let _ = self.delete_last_block();
                        let _ = self.delete_last_block();
                        self.process_received_block(received, now_unix)
                    }
                }
            }
            validate::ReceiveDecision::ForkCauseFive => {
                if let Some(metrics) = &self.metrics {
                    metrics.fork_events_total.with_label_values(&["five"]).inc();
                }
                match fork::fork_cause_five(&received, &local_last) {
                    fork::ForkFiveOutcome::KeepLocal => {
                        result.push(ChainError::Other("fork cause 5: local block kept".into()));
                        result
                    }
                    fork::ForkFiveOutcome::ReplaceWithReceived { equivocation } => {
                        if equivocation {
                            tracing::warn!(
                                generator = %received.generator_public_key.to_hex(),
                                local_id = %local_last.id.to_hex(),
                                received_id = %received.id.to_hex(),
                                "equivocating delegate detected (fork cause 5)"
                            );
                        }
                        let _ = self.delete_last_block();
                        self.process_received_block(received, now_unix)
                    }
                }
            }
            validate::ReceiveDecision::Accept => self.process_received_block(received, now_unix),
        }
    }

    fn process_received_block(&mut self, received: Block, now_unix: i64) -> ProcessResult {
        self.events.emit(Event::BlockReceive(received.clone()));

        let removed = self.pool.batch_remove(&received.transactions, &mut self.accounts);
        self.ensure_round_for_time(received.created_at as i64);

        let result = self.process(received.clone(), true, None, true, now_unix);

        if result.is_success() {
            let included: HashSet<_> = received.transactions.iter().map(|t| t.id).collect();
            for tx in removed {
                if included.contains(&tx.id) {
                    continue;
                }
                if self.pool.is_potential_conflict(&tx) {
                    self.queue.push(tx);
                } else {
                    self.pool.push(tx, &mut self.accounts, false);
                }
            }
        } else {
            for tx in removed {
                self.pool.push(tx, &mut self.accounts, false);
            }
        }

        result
    }

    /// Pops the best available transactions from the pool, builds and
    /// processes a new block locally (spec §4.7.8).
    pub fn generate_block(&mut self, signing_key: &SigningKey, created_at: i32, now_unix: i64) -> ProcessResult {
        let mut result = ProcessResult::ok();
        let Some(previous) = self.window.last().cloned() else {
            result.push(ChainError::Other("cannot generate block: no previous block".into()));
            return result;
        };

        let limit = self.config.max_transactions_per_block as usize;
        let popped = self.pool.pop_sorted_unconfirmed_transactions(limit, &mut self.accounts);

        self.ensure_round_for_time(now_unix);
        let block = self.create(popped.clone(), created_at, &previous, signing_key);

        self.events.emit(Event::BlockGenerate(block.clone()));
        let result = self.process(block, true, Some(signing_key), false, now_unix);

        if !result.is_success() {
            for tx in popped {
                if self.pool.is_potential_conflict(&tx) {
                    self.queue.push(tx);
                } else {
                    self.pool.push(tx, &mut self.accounts, false);
                }
            }
        }

        result
    }

    /// Applies the genesis block carrying `transactions`, bootstrapping
    /// every sender account before the block is signed (spec §4.7.10).
    pub fn apply_genesis_block(&mut self, mut transactions: Vec<Transaction>, signing_key: &SigningKey) -> ProcessResult {
        for tx in &transactions {
            self.accounts.add(tx.sender_address, Some(tx.sender_public_key));
        }
        transactions.sort_by(transaction_sort_func);

        let mut block = genesis_skeleton(
            self.config.current_block_version,
            PublicKey(signing_key.verifying_key().to_bytes()),
        );
        block.transactions = transactions;
        self.add_payload_hash(&mut block, signing_key);

        let now_unix = self.slots.get_slot_time(0);
        self.process(block, false, None, false, now_unix)
    }

    /// Rolls back the chain tip, reversing its transactions' confirmed
    /// and unconfirmed effects in LIFO order and restoring round
    /// bookkeeping (spec §4.7.9). Rejects at height 1 (the genesis
    /// block is never deleted).
    pub fn delete_last_block(&mut self) -> Result<Block, ChainError> {
        let Some(last) = self.window.last().cloned() else {
            return Err(ChainError::CannotDeleteGenesis);
        };
        if last.height == 1 {
            return Err(ChainError::CannotDeleteGenesis);
        }

        self.repo
            .delete_by_id(&last.id)
            .map_err(|e| ChainError::Storage(e.to_string()))?;

        self.ensure_round_for_time(last.created_at as i64);
        if let Some(round) = &mut self.round {
            round.unmark_forged(&last.generator_public_key);
        }

        self.window.pop_last();

        for tx in last.transactions.iter().rev() {
            if let TxAsset::Delegate(_) = &tx.asset {
                self.accounts.attach_delegate(tx.sender_address, None);
            }
            if let Some(sender) = self.accounts.get_by_address_mut(&tx.sender_address) {
                Dispatcher::undo(tx, sender);
                Dispatcher::undo_unconfirmed(tx, sender);
            }
        }

        self.events.emit(Event::UndoBlock(last.clone()));
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::sync::NullSyncHandle;
    use crate::storage::InMemoryBlockRepository;
    use crate::types::tx::{Asset, TransactionStatus, TxDelegate, TxRegister, TxSend};
    use crate::types::Address;
    use rand::rngs::OsRng;

    fn keypair() -> SigningKey {
        SigningKey::generate(&mut OsRng)
    }

    fn config() -> ChainConfig {
        ChainConfig {
            epoch_time: 0,
            slot_interval: 10,
            active_delegates_count: 4,
            min_round_block_height: 1,
            max_block_in_memory: 10,
            ..ChainConfig::default()
        }
    }

    fn new_engine() -> ConsensusEngine<InMemoryBlockRepository, NullSyncHandle> {
        ConsensusEngine::new(config(), InMemoryBlockRepository::new(), NullSyncHandle).unwrap()
    }

    fn signed_send(sk: &SigningKey, recipient: Address, amount: u64, fee: u64, created_at: i32, id_byte: u8) -> Transaction {
        let sender_pk = PublicKey(sk.verifying_key().to_bytes());
        let mut tx = Transaction {
            id: Hash256([id_byte; HASH_LEN]),
            sender_public_key: sender_pk,
            sender_address: Address::from_public_key(&sender_pk),
            recipient_address: Some(recipient),
            amount,
            fee,
            created_at,
            signature: Signature([0u8; SIGNATURE_LEN]),
            second_signature: None,
            asset: Asset::Send(TxSend { amount }),
            block_id: None,
            status: TransactionStatus::Created,
        };
        let sig = sk.sign(&tx.canonical_bytes());
        tx.signature = Signature(sig.to_bytes());
        tx.id = tx.compute_id();
        tx
    }

    fn signed_delegate(sk: &SigningKey, username: &str, fee: u64, created_at: i32, id_byte: u8) -> Transaction {
        let sender_pk = PublicKey(sk.verifying_key().to_bytes());
        let mut tx = Transaction {
            id: Hash256([id_byte; HASH_LEN]),
            sender_public_key: sender_pk,
            sender_address: Address::from_public_key(&sender_pk),
            recipient_address: None,
            amount: 0,
            fee,
            created_at,
            signature: Signature([0u8; SIGNATURE_LEN]),
            second_signature: None,
            asset: Asset::Delegate(TxDelegate { username: username.to_string() }),
            block_id: None,
            status: TransactionStatus::Created,
        };
        let sig = sk.sign(&tx.canonical_bytes());
        tx.signature = Signature(sig.to_bytes());
        tx.id = tx.compute_id();
        tx
    }

    fn signed_register(sk: &SigningKey, multisignatures: Vec<PublicKey>, multimin: u8, fee: u64, created_at: i32, id_byte: u8) -> Transaction {
        let sender_pk = PublicKey(sk.verifying_key().to_bytes());
        let mut tx = Transaction {
            id: Hash256([id_byte; HASH_LEN]),
            sender_public_key: sender_pk,
            sender_address: Address::from_public_key(&sender_pk),
            recipient_address: None,
            amount: 0,
            fee,
            created_at,
            signature: Signature([0u8; SIGNATURE_LEN]),
            second_signature: None,
            asset: Asset::Register(TxRegister { multisignatures, multimin, lifetime: 0 }),
            block_id: None,
            status: TransactionStatus::Created,
        };
        let sig = sk.sign(&tx.canonical_bytes());
        tx.signature = Signature(sig.to_bytes());
        tx.id = tx.compute_id();
        tx
    }

    #[test]
    fn genesis_then_generate_applies_a_block() {
        let mut engine = new_engine();
        let genesis_sk = keypair();

        let result = engine.apply_genesis_block(vec![], &genesis_sk);
        assert!(result.is_success(), "{:?}", result.errors);
        assert_eq!(engine.last_block().unwrap().height, 1);

        let generator_sk = keypair();
        engine.set_active_delegates(vec![PublicKey(generator_sk.verifying_key().to_bytes())]);

        let gen_result = engine.generate_block(&generator_sk, 10, 100);
        assert!(gen_result.is_success(), "{:?}", gen_result.errors);
        assert_eq!(engine.last_block().unwrap().height, 2);
    }

    #[test]
    fn receive_block_applies_immediate_child() {
        let mut engine = new_engine();
        let genesis_sk = keypair();
        engine.apply_genesis_block(vec![], &genesis_sk);

        let generator_sk = keypair();
        engine.set_active_delegates(vec![PublicKey(generator_sk.verifying_key().to_bytes())]);

        let previous = engine.last_block().unwrap().clone();
        let block = engine.create(vec![], 10, &previous, &generator_sk);

        let result = engine.receive_block(block, 100, false);
        assert!(result.is_success(), "{:?}", result.errors);
        assert_eq!(engine.last_block().unwrap().height, 2);
    }

    #[test]
    fn receive_block_applies_funded_send_transaction() {
        let mut engine = new_engine();
        let genesis_sk = keypair();
        engine.apply_genesis_block(vec![], &genesis_sk);

        let sender_sk = keypair();
        let sender_addr = Address::from_public_key(&PublicKey(sender_sk.verifying_key().to_bytes()));
        {
            let account = engine
                .accounts_mut()
                .add(sender_addr, Some(PublicKey(sender_sk.verifying_key().to_bytes())));
            account.balance = 1_000;
            account.u_balance = 1_000;
        }

        let generator_sk = keypair();
        engine.set_active_delegates(vec![PublicKey(generator_sk.verifying_key().to_bytes())]);

        let tx = signed_send(&sender_sk, Address(7), 100, 10, 10, 2);
        let previous = engine.last_block().unwrap().clone();
        let block = engine.create(vec![tx], 10, &previous, &generator_sk);

        let result = engine.process(block, false, None, false, 100);
        assert!(result.is_success(), "{:?}", result.errors);

        let sender = engine.accounts().get_by_address(&sender_addr).unwrap();
        assert_eq!(sender.balance, 890);
        assert_eq!(sender.u_balance, 890);
    }

    #[test]
    fn delete_last_block_rejects_genesis() {
        let mut engine = new_engine();
        let genesis_sk = keypair();
        let result = engine.apply_genesis_block(vec![], &genesis_sk);
        assert!(result.is_success());

        let err = engine.delete_last_block().unwrap_err();
        assert!(matches!(err, ChainError::CannotDeleteGenesis));
    }

    #[test]
    fn receive_block_detects_fork_cause_one_on_consecutive_height_wrong_parent() {
        let mut engine = new_engine();
        let genesis_sk = keypair();
        engine.apply_genesis_block(vec![], &genesis_sk);
        let genesis = engine.last_block().unwrap().clone();

        let generator_sk = keypair();
        engine.set_active_delegates(vec![PublicKey(generator_sk.verifying_key().to_bytes())]);

        // A fabricated parent at genesis's height but a different id, so a
        // block built on top of it lands one height above the local tip
        // with the wrong previousBlockId: the textbook fork cause 1.
        let mut fake_parent = genesis.clone();
        fake_parent.id = Hash256([77u8; HASH_LEN]);

        let forked = engine.create(vec![], 100, &fake_parent, &generator_sk);
        assert_eq!(forked.height, genesis.height + 1);
        assert_ne!(forked.previous_block_id, Some(genesis.id));

        let result = engine.receive_block(forked, 1_000, false);
        // createdAt(100) is later than genesis's createdAt(0), so the
        // received block doesn't outrank the local tip and is discarded
        // rather than triggering a rollback.
        assert!(!result.is_success());
        assert_eq!(engine.last_block().unwrap().id, genesis.id);
    }

    #[test]
    fn receive_block_rejects_same_id_as_already_processed() {
        let mut engine = new_engine();
        let genesis_sk = keypair();
        engine.apply_genesis_block(vec![], &genesis_sk);

        let tip = engine.last_block().unwrap().clone();
        let result = engine.receive_block(tip, 0, false);
        assert!(!result.is_success());
    }

    #[test]
    fn delegate_transaction_registers_and_undo_unregisters() {
        let mut engine = new_engine();
        let genesis_sk = keypair();
        engine.apply_genesis_block(vec![], &genesis_sk);

        let sender_sk = keypair();
        let sender_pk = PublicKey(sender_sk.verifying_key().to_bytes());
        let sender_addr = Address::from_public_key(&sender_pk);
        engine.accounts_mut().add(sender_addr, Some(sender_pk)).u_balance = 10_000_000_000;
        engine.accounts_mut().get_by_address_mut(&sender_addr).unwrap().balance = 10_000_000_000;

        let generator_sk = keypair();
        engine.set_active_delegates(vec![PublicKey(generator_sk.verifying_key().to_bytes())]);

        let tx = signed_delegate(&sender_sk, "alice", 2_500_000_000, 10, 3);
        let previous = engine.last_block().unwrap().clone();
        let block = engine.create(vec![tx], 10, &previous, &generator_sk);

        let result = engine.process(block, false, None, false, 100);
        assert!(result.is_success(), "{:?}", result.errors);
        assert_eq!(engine.accounts().delegate(&sender_addr).unwrap().username, "alice");
        assert!(engine.accounts().delegate_username_taken("alice"));

        engine.delete_last_block().unwrap();
        assert!(engine.accounts().delegate(&sender_addr).is_none());
        assert!(!engine.accounts().delegate_username_taken("alice"));
    }

    #[test]
    fn send_from_multisig_account_is_rejected_by_ready_gate() {
        let mut engine = new_engine();
        let genesis_sk = keypair();
        engine.apply_genesis_block(vec![], &genesis_sk);

        let sender_sk = keypair();
        let sender_pk = PublicKey(sender_sk.verifying_key().to_bytes());
        let sender_addr = Address::from_public_key(&sender_pk);
        engine.accounts_mut().add(sender_addr, Some(sender_pk)).u_balance = 10_000_000_000;
        engine.accounts_mut().get_by_address_mut(&sender_addr).unwrap().balance = 10_000_000_000;

        let generator_sk = keypair();
        engine.set_active_delegates(vec![PublicKey(generator_sk.verifying_key().to_bytes())]);

        let cosigner = keypair();
        let register = signed_register(
            &sender_sk,
            vec![PublicKey(cosigner.verifying_key().to_bytes())],
            1,
            1_000_000,
            10,
            4,
        );
        let previous = engine.last_block().unwrap().clone();
        let block = engine.create(vec![register], 10, &previous, &generator_sk);
        let result = engine.process(block, false, None, true, 1_000_000);
        assert!(result.is_success(), "{:?}", result.errors);
        assert!(engine.accounts().get_by_address(&sender_addr).unwrap().is_multisig());

        // Now that the account is a multisig quorum, a plain single-signed
        // send from it is rejected at the ready() gate.
        let tx = signed_send(&sender_sk, Address(7), 100, 10, 20, 5);
        let previous = engine.last_block().unwrap().clone();
        let block = engine.create(vec![tx], 20, &previous, &generator_sk);

        let result = engine.process(block, false, None, true, 1_000_000);
        assert!(!result.is_success());
        assert!(result.errors.iter().any(|e| e.contains("multisig") || e.contains("quorum")));

        let sender = engine.accounts().get_by_address(&sender_addr).unwrap();
        assert_eq!(sender.balance, 10_000_000_000 - 1_000_000);
    }

    #[test]
    fn duplicate_delegate_username_is_rejected() {
        let mut engine = new_engine();
        let genesis_sk = keypair();
        engine.apply_genesis_block(vec![], &genesis_sk);

        let first_sk = keypair();
        let first_pk = PublicKey(first_sk.verifying_key().to_bytes());
        let first_addr = Address::from_public_key(&first_pk);
        engine.accounts_mut().add(first_addr, Some(first_pk)).u_balance = 10_000_000_000;
        engine.accounts_mut().get_by_address_mut(&first_addr).unwrap().balance = 10_000_000_000;

        let second_sk = keypair();
        let second_pk = PublicKey(second_sk.verifying_key().to_bytes());
        let second_addr = Address::from_public_key(&second_pk);
        engine.accounts_mut().add(second_addr, Some(second_pk)).u_balance = 10_000_000_000;
        engine.accounts_mut().get_by_address_mut(&second_addr).unwrap().balance = 10_000_000_000;

        let generator_sk = keypair();
        engine.set_active_delegates(vec![PublicKey(generator_sk.verifying_key().to_bytes())]);

        let first_tx = signed_delegate(&first_sk, "alice", 2_500_000_000, 10, 3);
        let previous = engine.last_block().unwrap().clone();
        let first_block = engine.create(vec![first_tx], 10, &previous, &generator_sk);
        assert!(engine.process(first_block, false, None, false, 100).is_success());

        let second_tx = signed_delegate(&second_sk, "alice", 2_500_000_000, 20, 4);
        let previous = engine.last_block().unwrap().clone();
        let second_block = engine.create(vec![second_tx], 20, &previous, &generator_sk);

        let result = engine.process(second_block, false, None, false, 200);
        assert!(!result.is_success());
        assert_eq!(engine.accounts().delegate(&second_addr), None);
    }
}
