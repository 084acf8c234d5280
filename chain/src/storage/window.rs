//! In-memory sliding window of the last N blocks (C6).
//!
//! Consulted on the hot path of block receive/verify/process without
//! touching the durable repository: `getLast`, slot-range checks in
//! `verifyBlock`, and membership checks in `process` all read from
//! here.

use std::collections::VecDeque;

use crate::types::{Block, BlockId};

/// Sliding window holding at most `capacity` of the most recently
/// applied blocks, newest at the back.
pub struct BlockWindow {
    capacity: usize,
    blocks: VecDeque<Block>,
}

impl BlockWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            blocks: VecDeque::new(),
        }
    }

    /// Rebuilds the window from a durable-layer load, oldest first.
    pub fn from_blocks(capacity: usize, blocks: Vec<Block>) -> Self {
        let mut window = Self::new(capacity);
        for block in blocks {
            window.push(block);
        }
        window
    }

    /// The current chain tip, if any block has been pushed yet.
    pub fn last(&self) -> Option<&Block> {
        self.blocks.back()
    }

    /// Appends `block`, evicting the oldest entry if the window is at
    /// capacity.
    pub fn push(&mut self, block: Block) {
        if self.blocks.len() >= self.capacity {
            self.blocks.pop_front();
        }
        self.blocks.push_back(block);
    }

    /// Removes and returns the current tip, restoring the prior block
    /// as the new tip (used by `deleteLastBlock`). Returns `None` if
    /// the window is empty.
    pub fn pop_last(&mut self) -> Option<Block> {
        self.blocks.pop_back()
    }

    /// `true` if a block with this id is present in the window.
    pub fn has(&self, id: &BlockId) -> bool {
        self.blocks.iter().any(|b| &b.id == id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
