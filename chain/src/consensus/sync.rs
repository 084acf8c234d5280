//! Sync interface (C8). The actual peer wire protocol is out of scope
//! (spec §1 Non-goals); this models only the boundary the consensus
//! core calls across — broadcasting newly applied blocks, asking for a
//! common ancestor, and pulling a range of blocks during catch-up.

use crate::types::{Block, BlockId};

pub trait SyncHandle: Send + Sync {
    /// Announces a freshly applied block to peers.
    fn broadcast_block(&self, block: &Block);

    /// Asks the sync layer to locate a common ancestor with peers,
    /// starting its search from `since`.
    fn request_common_block(&self, since: BlockId);

    /// Asks the sync layer to fetch blocks starting at `from_height`.
    fn request_blocks_from(&self, from_height: u64);

    /// Whether the node is currently mid-sync. While `true`, received
    /// blocks and generated blocks are not broadcast (spec §4.7.6/§4.7.8).
    fn syncing(&self) -> bool;
}

/// No-op implementation for single-node operation and tests.
#[derive(Default)]
pub struct NullSyncHandle;

impl SyncHandle for NullSyncHandle {
    fn broadcast_block(&self, _block: &Block) {}

    fn request_common_block(&self, _since: BlockId) {}

    fn request_blocks_from(&self, _from_height: u64) {}

    fn syncing(&self) -> bool {
        false
    }
}
