//! Error taxonomy and the `{success, errors[]}` response envelope.
//!
//! Per the propagation policy: errors accumulate into [`ProcessResult`]
//! rather than being thrown partway through a pipeline. Individual
//! fallible steps still return `Result<_, ChainError>` internally, but
//! whole-block and whole-transaction pipelines collect every failure
//! into the envelope before returning to the caller.

use thiserror::Error;

/// Errors surfaced anywhere in block or transaction processing.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("signature verification failed")]
    BadSignature,

    #[error("insufficient balance: need {need}, have {have}")]
    InsufficientBalance { need: u64, have: u64 },

    #[error("duplicate transaction id")]
    DuplicateTransaction,

    #[error("multisignature quorum not satisfied")]
    MultisigNotReady,

    #[error("block id mismatch: expected {expected}, computed {computed}")]
    BlockIdMismatch { expected: String, computed: String },

    #[error("block version {found} does not match configured version {expected}")]
    BadVersion { expected: u32, found: u32 },

    #[error("previous block {0} not found")]
    MissingParent(String),

    #[error("payload hash mismatch")]
    PayloadHashMismatch,

    #[error("block has {found} transactions, exceeds configured max {max}")]
    TooManyTransactions { found: u32, max: u32 },

    #[error("transaction count mismatch: header says {header}, block has {actual}")]
    TransactionCountMismatch { header: u32, actual: usize },

    #[error("block already known: {0}")]
    BlockAlreadyProcessed(String),

    #[error("block slot {block_slot} not in (last={last_slot}, current+window={window_end}]")]
    BlockSlotOutOfRange {
        block_slot: i64,
        last_slot: i64,
        window_end: i64,
    },

    #[error("generatorPublicKey does not exist in current round")]
    UnknownGenerator,

    #[error("blockSlot {block_slot} not equal with generatorSlot {generator_slot}")]
    WrongGeneratorSlot { block_slot: i64, generator_slot: i64 },

    #[error("cannot delete the genesis block")]
    CannotDeleteGenesis,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Other(String),
}

/// Response envelope used throughout the block/transaction pipelines:
/// `{success, errors[]}`. Errors accumulate rather than short-circuit
/// wherever the spec calls for "collect, don't throw" semantics (e.g.
/// `verifyBlock`).
#[derive(Debug, Default, Clone)]
pub struct ProcessResult {
    pub errors: Vec<String>,
}

impl ProcessResult {
    pub fn ok() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn push(&mut self, err: impl ToString) {
        self.errors.push(err.to_string());
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors in most-recent-first order, per spec §4.7.3's diagnostic
    /// convention for `verifyBlock`.
    pub fn reversed_errors(&self) -> Vec<String> {
        let mut errs = self.errors.clone();
        errs.reverse();
        errs
    }
}
