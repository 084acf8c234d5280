// src/main.rs
//
// Minimal demo node that wires up the chain library:
//
// - RocksDB-backed durable storage (C6)
// - the no-op sync handle (single-node; C8 is interface-only here)
// - Prometheus metrics exporter on /metrics
// - a fixed-interval loop that applies a genesis block once, then
//   forges empty blocks at every slot assigned to the demo delegate.

use std::{sync::Arc, time::Duration};

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

use chain::{
    ChainConfig, ConsensusEngine, MetricsRegistry, NullSyncHandle, PublicKey,
    RocksDbBlockRepository, run_prometheus_http_server,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run_node().await {
        tracing::error!(%err, "fatal error");
        std::process::exit(1);
    }
}

async fn run_node() -> Result<(), String> {
    let cfg = ChainConfig::default();

    // ---------------------------
    // Metrics registry + exporter
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new().map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    if cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                tracing::error!(error = %e, "metrics HTTP server error");
            }
        });
        tracing::info!(%addr, "metrics exporter listening");
    }

    // ---------------------------
    // Storage backend (RocksDB)
    // ---------------------------

    let store = RocksDbBlockRepository::open(&cfg.storage)
        .map_err(|e| format!("failed to open RocksDB store at {}: {e:?}", cfg.storage.path))?;

    // ---------------------------
    // Engine + demo delegate identity
    // ---------------------------

    let genesis_key = SigningKey::generate(&mut OsRng);
    let delegate_key = SigningKey::generate(&mut OsRng);
    let delegate_pk = PublicKey(delegate_key.verifying_key().to_bytes());

    let mut engine = ConsensusEngine::new(cfg.clone(), store, NullSyncHandle)
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

    tracing::info!(slot_interval = cfg.slot_interval, "starting forging loop");

    loop {
        let now = current_unix_timestamp();
        let result = engine.generate_block(&delegate_key, now as i32, now);

        match result.is_success() {
            true => {
                if let Some(block) = engine.last_block() {
                    tracing::info!(height = block.height, id = %block.id.to_hex(), "forged block");
                }
            }
            false => tracing::warn!(errors = ?result.errors, "failed to forge block"),
        }

        tokio::time::sleep(Duration::from_secs(cfg.slot_interval.max(1) as u64)).await;
    }
}

/// Returns the current wall-clock time as seconds since Unix epoch.
fn current_unix_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
