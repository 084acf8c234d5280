//! RocksDB-backed [`BlockRepository`] (C6 durable layer).
//!
//! Two column families:
//!
//! - `"blocks"`: `BlockId` (32 bytes) -> bincode-encoded [`Block`].
//! - `"heights"`: big-endian `u64` height -> `BlockId`, kept in sync with
//!   `"blocks"` so `load_last_n_blocks`/`load_blocks_offset` can iterate
//!   in height order without a full table scan.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, DB};

use super::BlockRepository;
use crate::types::{Block, BlockId, Hash256, HASH_LEN};

/// Configuration for [`RocksDbBlockRepository`].
#[derive(Clone, Debug)]
pub struct RocksDbConfig {
    /// Filesystem path to the RocksDB database directory.
    pub path: String,
    /// Whether to create the database and missing column families if
    /// they do not yet exist.
    pub create_if_missing: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "data/chain-db".to_string(),
            create_if_missing: true,
        }
    }
}

/// Storage-level error type.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("rocksdb error: {0}")]
    RocksDb(#[from] rocksdb::Error),
    #[error("missing column family: {0}")]
    MissingColumnFamily(&'static str),
    #[error("corrupted metadata: {0}")]
    Corrupted(&'static str),
    #[error("failed to encode/decode block: {0}")]
    Codec(String),
}

pub struct RocksDbBlockRepository {
    db: DB,
}

impl RocksDbBlockRepository {
    pub fn open(cfg: &RocksDbConfig) -> Result<Self, StorageError> {
        let path = Path::new(&cfg.path);

        let mut opts = Options::default();
        opts.create_if_missing(cfg.create_if_missing);
        opts.create_missing_column_families(cfg.create_if_missing);

        let cfs = vec![
            ColumnFamilyDescriptor::new("default", Options::default()),
            ColumnFamilyDescriptor::new("blocks", Options::default()),
            ColumnFamilyDescriptor::new("heights", Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;
        Ok(Self { db })
    }

    fn cf_blocks(&self) -> Result<Arc<BoundColumnFamily<'_>>, StorageError> {
        self.db
            .cf_handle("blocks")
            .ok_or(StorageError::MissingColumnFamily("blocks"))
    }

    fn cf_heights(&self) -> Result<Arc<BoundColumnFamily<'_>>, StorageError> {
        self.db
            .cf_handle("heights")
            .ok_or(StorageError::MissingColumnFamily("heights"))
    }

    fn encode_block(block: &Block) -> Result<Vec<u8>, StorageError> {
        bincode::serde::encode_to_vec(block, bincode::config::standard())
            .map_err(|e| StorageError::Codec(e.to_string()))
    }

    fn decode_block(bytes: &[u8]) -> Result<Block, StorageError> {
        let (block, _): (Block, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| StorageError::Codec(e.to_string()))?;
        Ok(block)
    }
}

impl BlockRepository for RocksDbBlockRepository {
    fn batch_save(&mut self, block: &Block) -> Result<(), StorageError> {
        let cf_blocks = self.cf_blocks()?;
        let cf_heights = self.cf_heights()?;

        let bytes = Self::encode_block(block)?;
        self.db.put_cf(&cf_blocks, block.id.as_bytes(), bytes)?;
        self.db
            .put_cf(&cf_heights, block.height.to_be_bytes(), block.id.as_bytes())?;
        Ok(())
    }

    fn delete_by_id(&mut self, id: &BlockId) -> Result<(), StorageError> {
        let cf_blocks = self.cf_blocks()?;
        if let Some(bytes) = self.db.get_cf(&cf_blocks, id.as_bytes())? {
            let block = Self::decode_block(&bytes)?;
            let cf_heights = self.cf_heights()?;
            self.db.delete_cf(&cf_heights, block.height.to_be_bytes())?;
        }
        self.db.delete_cf(&cf_blocks, id.as_bytes())?;
        Ok(())
    }

    fn load_last_n_blocks(&self, limit: usize) -> Result<Vec<Block>, StorageError> {
        let cf_blocks = self.cf_blocks()?;
        let cf_heights = self.cf_heights()?;

        let mut ids: Vec<BlockId> = Vec::new();
        for item in self.db.iterator_cf(&cf_heights, IteratorMode::End) {
            let (_, value) = item?;
            if value.len() != HASH_LEN {
                return Err(StorageError::Corrupted("height index value length"));
            }
            let mut arr = [0u8; HASH_LEN];
            arr.copy_from_slice(&value);
            ids.push(Hash256(arr));
            if ids.len() >= limit {
                break;
            }
        }
        ids.reverse();

        ids.into_iter()
            .map(|id| {
                let bytes = self
                    .db
                    .get_cf(&cf_blocks, id.as_bytes())?
                    .ok_or(StorageError::Corrupted("dangling height index entry"))?;
                Self::decode_block(&bytes)
            })
            .collect()
    }

    fn load_blocks_offset(&self, limit: usize, offset: u64) -> Result<Vec<Block>, StorageError> {
        let cf_blocks = self.cf_blocks()?;
        let cf_heights = self.cf_heights()?;

        let start_key = offset.to_be_bytes();
        let mut out = Vec::new();
        for item in self
            .db
            .iterator_cf(&cf_heights, IteratorMode::From(&start_key, rocksdb::Direction::Forward))
        {
            let (_, value) = item?;
            if value.len() != HASH_LEN {
                return Err(StorageError::Corrupted("height index value length"));
            }
            let mut arr = [0u8; HASH_LEN];
            arr.copy_from_slice(&value);
            let id = Hash256(arr);
            let bytes = self
                .db
                .get_cf(&cf_blocks, id.as_bytes())?
                .ok_or(StorageError::Corrupted("dangling height index entry"))?;
            out.push(Self::decode_block(&bytes)?);
            if out.len() >= limit {
                break;
            }
        }
        Ok(out)
    }
}
