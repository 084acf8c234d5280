// api-gateway/src/main.rs

//! API gateway binary.
//!
//! This binary exposes a small HTTP API on top of the `chain` crate:
//!
//! - `GET /health`
//! - `GET /delegates` (`GET_DELEGATES`)
//!
//! It embeds a `DefaultConsensusEngine` (RocksDB-backed), runs it through
//! a background forging loop using a single demo delegate identity, and
//! serves a Prometheus metrics exporter on `/metrics`.

mod config;
mod routes;
mod state;

use std::{sync::Arc, time::Duration};

use axum::{Router, routing::get};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use tokio::signal;

use chain::{
    ChainConfig, ConsensusEngine, MetricsRegistry, NullSyncHandle, PublicKey,
    RocksDbBlockRepository, run_prometheus_http_server,
};
use config::ApiConfig;
use routes::{delegates, health};
use state::{AppState, SharedState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "api_gateway=info,chain=info".to_string()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let api_cfg = ApiConfig::default();
    let chain_cfg = ChainConfig::default();

    // ---------------------------
    // Metrics
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new().map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    if chain_cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = chain_cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                eprintln!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{}/metrics", addr);
    }

    // ---------------------------
    // Storage + consensus engine
    // ---------------------------

    let store = RocksDbBlockRepository::open(&chain_cfg.storage).map_err(|e| {
        format!(
            "failed to open RocksDB store at {}: {e:?}",
            chain_cfg.storage.path
        )
    })?;

    let genesis_key = SigningKey::generate(&mut OsRng);
    let delegate_key = SigningKey::generate(&mut OsRng);
    let delegate_pk = PublicKey(delegate_key.verifying_key().to_bytes());

    let mut engine: chain::DefaultConsensusEngine =
        ConsensusEngine::new(chain_cfg.clone(), store, NullSyncHandle)
            .map_err(|e| format!("failed to initialise consensus engine: {e}"))?
            .with_metrics(Arc::new(metrics.consensus.clone()));

    if engine.last_block().is_none() {
        let result = engine.apply_genesis_block(Vec::new(), &genesis_key);
        if !result.is_success() {
            return Err(format!("failed to apply genesis block: {:?}", result.errors));
        }
        tracing::info!("applied genesis block");
    }

    engine.set_active_delegates(vec![delegate_pk]);

    // ---------------------------
    // Shared state
    // ---------------------------

    let app_state: SharedState = Arc::new(AppState {
        engine: tokio::sync::Mutex::new(engine),
        metrics: metrics.clone(),
    });

    // ---------------------------
    // Forging loop
    // ---------------------------

    let slot_interval = chain_cfg.slot_interval.max(1) as u64;
    let forging_state = app_state.clone();
    tokio::spawn(async move {
        run_forging_loop(forging_state, delegate_key, slot_interval).await;
    });

    // ---------------------------
    // HTTP router
    // ---------------------------

    let app = Router::new()
        .route("/health", get(health::health))
        .route("/delegates", get(delegates::get_delegates))
        .with_state(app_state);

    tracing::info!("API gateway listening on http://{}", api_cfg.listen_addr);

    let listener = tokio::net::TcpListener::bind(api_cfg.listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", api_cfg.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("API server error: {e}"))?;

    Ok(())
}

/// Background forging loop.
///
/// Periodically asks the consensus engine to forge and apply a new block
/// using whatever transactions are currently queued in its mempool.
async fn run_forging_loop(state: SharedState, delegate_key: SigningKey, slot_interval: u64) {
    let interval = Duration::from_secs(slot_interval.max(1));
    tracing::info!("forging loop running with interval {}s", interval.as_secs());

    loop {
        let now = current_unix_timestamp();

        {
            let mut engine = state.engine.lock().await;
            let result = engine.generate_block(&delegate_key, now as i32, now);

            match result.is_success() {
                true => {
                    if let Some(block) = engine.last_block() {
                        tracing::info!(height = block.height, id = %block.id.to_hex(), "forged block");
                    }
                }
                false => tracing::warn!(errors = ?result.errors, "failed to forge block"),
            }
        }

        tokio::time::sleep(interval).await;
    }
}

/// Returns the current wall-clock time as seconds since Unix epoch.
fn current_unix_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
