//! Consensus core (C7): block creation, verification, application and
//! fork resolution, plus the two interfaces it calls across (C8 sync,
//! C9 events).

pub mod engine;
pub mod events;
pub mod fork;
pub mod sync;
pub mod validate;

pub use engine::ConsensusEngine;
pub use events::{Event, EventBus};
pub use sync::{NullSyncHandle, SyncHandle};
