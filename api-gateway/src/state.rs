//! Shared application state.

use std::sync::Arc;

use tokio::sync::Mutex;

use chain::{DefaultConsensusEngine, MetricsRegistry};

/// Shared state held by the API and background tasks.
///
/// This is wrapped in an [`Arc`] and passed to request handlers via Axum's
/// `State` extractor. The consensus engine owns its own mempool (queue +
/// pool) and account registry internally; handlers reach into it through
/// its public accessors rather than duplicating state here.
pub struct AppState {
    /// Embedded consensus engine (mempool, account registry, storage).
    pub engine: Mutex<DefaultConsensusEngine>,
    /// Metrics registry shared between consensus and the API.
    pub metrics: Arc<MetricsRegistry>,
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;
