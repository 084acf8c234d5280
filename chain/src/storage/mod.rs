//! Block storage (C6).
//!
//! Two halves, matching spec §4.6:
//!
//! - [`window::BlockWindow`]: an in-memory sliding window of the last
//!   `MAX_BLOCK_IN_MEMORY` blocks plus a `lastBlock` pointer, consulted
//!   on every block receive/verify without touching the durable layer.
//! - [`BlockRepository`]: the durable layer's interface
//!   (`batchSave`/`deleteById`/`loadLastNBlocks`/`loadBlocksOffset`).
//!   [`rocksdb::RocksDbBlockRepository`] and
//!   [`mem::InMemoryBlockRepository`] are the two implementations
//!   shipped here; the real SQL repository stays out of scope per
//!   spec §1.

pub mod mem;
pub mod rocksdb;
pub mod window;

use crate::types::{Block, BlockId};

pub use mem::InMemoryBlockRepository;
pub use rocksdb::{RocksDbBlockRepository, RocksDbConfig, StorageError};
pub use window::BlockWindow;

/// Durable block repository, external to the consensus-critical core
/// per spec §1/§6. Only this interface is modeled; the concrete SQL
/// schema is somebody else's problem.
pub trait BlockRepository {
    /// Persists `block` (and, by extension, its transactions) durably.
    fn batch_save(&mut self, block: &Block) -> Result<(), StorageError>;

    /// Removes the block identified by `id` from durable storage.
    fn delete_by_id(&mut self, id: &BlockId) -> Result<(), StorageError>;

    /// Loads the most recent `limit` blocks in ascending height order,
    /// used to rehydrate [`BlockWindow`] on startup.
    fn load_last_n_blocks(&self, limit: usize) -> Result<Vec<Block>, StorageError>;

    /// Loads `limit` blocks starting at `offset` (ascending height),
    /// used by the offset-loading replay loop.
    fn load_blocks_offset(&self, limit: usize, offset: u64) -> Result<Vec<Block>, StorageError>;
}
