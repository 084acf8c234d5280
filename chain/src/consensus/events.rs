//! Event bus (C9): process-wide pub/sub connecting controllers, sync,
//! and services, implemented over `tokio::sync::broadcast` (already a
//! workspace dependency via the teacher's `Cargo.toml`).

use tokio::sync::broadcast;

use crate::types::{Block, Transaction};

/// Topics listed in spec §6.
#[derive(Clone, Debug)]
pub enum Event {
    BlockReceive(Block),
    BlockGenerate(Block),
    BlockchainReady,
    NewBlocks(Vec<Block>),
    ApplyBlock(Block),
    UndoBlock(Block),
    EmitSyncBlocks,
    TransactionReceive(Transaction),
    TransactionCreate(Transaction),
}

/// Thin wrapper around a `broadcast::Sender<Event>`. Subscribers that
/// lag behind simply miss older events (the default `broadcast`
/// semantics); nothing in the consensus-critical core depends on every
/// subscriber seeing every event; state itself is authoritative in
/// `AccountRegistry`/`BlockWindow`/the mempool.
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publishes `event`. Errors (no subscribers) are not a failure
    /// condition for the publisher.
    pub fn emit(&self, event: Event) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
