//! Transaction dispatcher (C3).
//!
//! One [`TransactionHandler`] per transaction type, selected by
//! [`Dispatcher::handler_for`]. Handlers implement the capability set
//! `{verify, verify_unconfirmed, calculate_fee, apply_unconfirmed,
//! undo_unconfirmed, apply, undo, ready}`; `getBytes` lives on
//! [`crate::types::Transaction::canonical_bytes`] directly since it
//! needs no per-type dispatch.

mod handlers;

use crate::config::ChainConfig;
use crate::error::ChainError;
use crate::types::{Account, Transaction, TransactionKind};

/// Per-transaction-type behavior.
pub trait TransactionHandler {
    /// Structural and signature correctness, independent of account state.
    fn verify(&self, tx: &Transaction) -> Result<(), ChainError>;

    /// Checks against current unconfirmed sender state: balance
    /// sufficiency, and absence of forbidden conflicts.
    fn verify_unconfirmed(&self, tx: &Transaction, sender: &Account) -> Result<(), ChainError>;

    /// Type-specific fee, given the current sender state (vote fees are
    /// stake-dependent and so need `sender`).
    fn calculate_fee(&self, tx: &Transaction, sender: &Account, config: &ChainConfig) -> u64;

    /// Mutates `u_balance` and unconfirmed secondary state.
    fn apply_unconfirmed(&self, tx: &Transaction, sender: &mut Account);

    /// Exact inverse of `apply_unconfirmed`.
    fn undo_unconfirmed(&self, tx: &Transaction, sender: &mut Account);

    /// Mutates confirmed `balance` and persistent state.
    fn apply(&self, tx: &Transaction, sender: &mut Account);

    /// Exact inverse of `apply`.
    fn undo(&self, tx: &Transaction, sender: &mut Account);

    /// True when multisig quorum is satisfied, or the sender is not a
    /// multisig account.
    fn ready(&self, _tx: &Transaction, sender: &Account) -> bool {
        !sender.is_multisig()
    }
}

/// Resolves a [`Transaction`] to its [`TransactionHandler`].
pub struct Dispatcher;

impl Dispatcher {
    pub fn handler_for(kind: TransactionKind) -> &'static dyn TransactionHandler {
        match kind {
            TransactionKind::Send => &handlers::SendHandler,
            TransactionKind::Vote => &handlers::VoteHandler,
            TransactionKind::Stake => &handlers::StakeHandler,
            TransactionKind::Register => &handlers::RegisterHandler,
            TransactionKind::Signature => &handlers::SignatureHandler,
            TransactionKind::Delegate => &handlers::DelegateHandler,
        }
    }

    pub fn verify(tx: &Transaction) -> Result<(), ChainError> {
        Self::handler_for(tx.kind()).verify(tx)
    }

    pub fn verify_unconfirmed(tx: &Transaction, sender: &Account) -> Result<(), ChainError> {
        Self::handler_for(tx.kind()).verify_unconfirmed(tx, sender)
    }

    pub fn calculate_fee(tx: &Transaction, sender: &Account, config: &ChainConfig) -> u64 {
        Self::handler_for(tx.kind()).calculate_fee(tx, sender, config)
    }

    pub fn apply_unconfirmed(tx: &Transaction, sender: &mut Account) {
        Self::handler_for(tx.kind()).apply_unconfirmed(tx, sender)
    }

    pub fn undo_unconfirmed(tx: &Transaction, sender: &mut Account) {
        Self::handler_for(tx.kind()).undo_unconfirmed(tx, sender)
    }

    pub fn apply(tx: &Transaction, sender: &mut Account) {
        Self::handler_for(tx.kind()).apply(tx, sender)
    }

    pub fn undo(tx: &Transaction, sender: &mut Account) {
        Self::handler_for(tx.kind()).undo(tx, sender)
    }

    pub fn ready(tx: &Transaction, sender: &Account) -> bool {
        Self::handler_for(tx.kind()).ready(tx, sender)
    }
}
