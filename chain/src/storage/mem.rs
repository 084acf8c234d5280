//! In-memory [`BlockRepository`], useful for tests and for running the
//! demo node without a RocksDB data directory.

use std::collections::HashMap;

use super::{BlockRepository, StorageError};
use crate::types::{Block, BlockId};

#[derive(Default)]
pub struct InMemoryBlockRepository {
    by_id: HashMap<BlockId, Block>,
    by_height: Vec<BlockId>,
}

impl InMemoryBlockRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockRepository for InMemoryBlockRepository {
    fn batch_save(&mut self, block: &Block) -> Result<(), StorageError> {
        self.by_height.push(block.id);
        self.by_id.insert(block.id, block.clone());
        Ok(())
    }

    fn delete_by_id(&mut self, id: &BlockId) -> Result<(), StorageError> {
        self.by_id.remove(id);
        self.by_height.retain(|existing| existing != id);
        Ok(())
    }

    fn load_last_n_blocks(&self, limit: usize) -> Result<Vec<Block>, StorageError> {
        let start = self.by_height.len().saturating_sub(limit);
        Ok(self.by_height[start..]
            .iter()
            .filter_map(|id| self.by_id.get(id).cloned())
            .collect())
    }

    fn load_blocks_offset(&self, limit: usize, offset: u64) -> Result<Vec<Block>, StorageError> {
        let offset = offset as usize;
        if offset >= self.by_height.len() {
            return Ok(Vec::new());
        }
        let end = (offset + limit).min(self.by_height.len());
        Ok(self.by_height[offset..end]
            .iter()
            .filter_map(|id| self.by_id.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Hash256, PublicKey, Signature, HASH_LEN, SIGNATURE_LEN};

    fn dummy_block(height: u64, id_byte: u8) -> Block {
        Block {
            id: Hash256([id_byte; HASH_LEN]),
            version: 1,
            height,
            previous_block_id: Some(Hash256([0u8; HASH_LEN])),
            created_at: height as i32,
            generator_public_key: PublicKey([1u8; 32]),
            signature: Signature([0u8; SIGNATURE_LEN]),
            payload_hash: Hash256([0u8; HASH_LEN]),
            transaction_count: 0,
            amount: 0,
            fee: 0,
            transactions: Vec::new(),
        }
    }

    #[test]
    fn batch_save_then_delete_by_id() {
        let mut repo = InMemoryBlockRepository::new();
        let block = dummy_block(1, 1);
        repo.batch_save(&block).unwrap();
        assert_eq!(repo.load_last_n_blocks(10).unwrap().len(), 1);

        repo.delete_by_id(&block.id).unwrap();
        assert_eq!(repo.load_last_n_blocks(10).unwrap().len(), 0);
    }

    #[test]
    fn load_blocks_offset_paginates() {
        let mut repo = InMemoryBlockRepository::new();
        for h in 1..=5u64 {
            repo.batch_save(&dummy_block(h, h as u8)).unwrap();
        }
        let page = repo.load_blocks_offset(2, 1).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].height, 2);
        assert_eq!(page[1].height, 3);
    }

    #[test]
    fn load_last_n_blocks_returns_most_recent() {
        let mut repo = InMemoryBlockRepository::new();
        for h in 1..=5u64 {
            repo.batch_save(&dummy_block(h, h as u8)).unwrap();
        }
        let last = repo.load_last_n_blocks(2).unwrap();
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].height, 4);
        assert_eq!(last[1].height, 5);
    }
}
