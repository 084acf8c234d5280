//! Chain library crate.
//!
//! This crate implements the consensus-critical core of a delegated
//! proof-of-stake node:
//!
//! - strongly-typed domain types (`types`),
//! - slot/round arithmetic (`slots`),
//! - the account registry (`accounts`),
//! - the per-transaction-type dispatcher (`dispatch`),
//! - the two-tier transaction mempool (`mempool`),
//! - block storage, in-memory and durable (`storage`),
//! - the consensus engine, fork resolution, sync and event interfaces
//!   (`consensus`),
//! - Prometheus-based metrics (`metrics`),
//! - and top-level node configuration (`config`).
//!
//! The HTTP-facing surface (the `api-gateway` binary crate) and the
//! peer wire protocol stay out of this crate; only the interfaces they
//! call across (`consensus::SyncHandle`, `consensus::EventBus`) live
//! here.

pub mod accounts;
pub mod config;
pub mod consensus;
pub mod dispatch;
pub mod error;
pub mod mempool;
pub mod metrics;
pub mod slots;
pub mod storage;
pub mod types;

pub use accounts::AccountRegistry;
pub use config::ChainConfig;
pub use consensus::{ConsensusEngine, Event, EventBus, NullSyncHandle, SyncHandle};
pub use dispatch::{Dispatcher, TransactionHandler};
pub use error::{ChainError, ProcessResult};
pub use mempool::{TransactionPool, TransactionQueue};
pub use metrics::{run_prometheus_http_server, ConsensusMetrics, MetricsRegistry};
pub use slots::SlotService;
pub use storage::{BlockRepository, BlockWindow, InMemoryBlockRepository, RocksDbBlockRepository, RocksDbConfig, StorageError};

// Re-export domain types at the crate root for convenience.
pub use types::*;

/// Type alias for the default node stack: RocksDB-backed durable
/// storage with the no-op sync handle, for single-node operation.
pub type DefaultConsensusEngine = ConsensusEngine<RocksDbBlockRepository, NullSyncHandle>;
