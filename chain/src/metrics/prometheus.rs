//! Prometheus-backed metrics and HTTP exporter.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and a set of strongly-typed consensus metrics, and an
//! async HTTP exporter that serves `/metrics` using `hyper`.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Consensus-related Prometheus metrics.
///
/// These are registered into a [`Registry`] and can be updated from
/// `crate::consensus`/`crate::mempool` code.
#[derive(Clone)]
pub struct ConsensusMetrics {
    /// Total blocks successfully applied to the chain.
    pub blocks_applied_total: IntCounter,
    /// Blocks rejected, labeled by the failing check (`"signature"`,
    /// `"version"`, `"slot"`, `"payload"`, ...).
    pub blocks_rejected_total: IntCounterVec,
    /// Fork events observed, labeled by cause (`"one"` or `"five"`, per
    /// the glossary's fork-cause numbering).
    pub fork_events_total: IntCounterVec,
    /// Wall-clock time spent in `ConsensusEngine::process`, in seconds.
    pub block_process_seconds: Histogram,
    /// Current size of the indexed transaction pool (C5).
    pub mempool_pool_size: IntGauge,
    /// Current size of the FIFO transaction queue (C4).
    pub mempool_queue_size: IntGauge,
}

impl ConsensusMetrics {
    /// Registers consensus metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let blocks_applied_total = IntCounter::with_opts(Opts::new(
            "consensus_blocks_applied_total",
            "Total number of blocks successfully applied to the chain",
        ))?;
        registry.register(Box::new(blocks_applied_total.clone()))?;

        let blocks_rejected_total = IntCounterVec::new(
            Opts::new(
                "consensus_blocks_rejected_total",
                "Total number of blocks rejected, labeled by failing check",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(blocks_rejected_total.clone()))?;

        let fork_events_total = IntCounterVec::new(
            Opts::new(
                "consensus_fork_events_total",
                "Total number of fork events observed, labeled by cause",
            ),
            &["cause"],
        )?;
        registry.register(Box::new(fork_events_total.clone()))?;

        let block_process_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "consensus_block_process_seconds",
                "Time spent processing a block end to end, in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )?;
        registry.register(Box::new(block_process_seconds.clone()))?;

        let mempool_pool_size = IntGauge::with_opts(Opts::new(
            "mempool_pool_size",
            "Current number of transactions staged in the indexed pool",
        ))?;
        registry.register(Box::new(mempool_pool_size.clone()))?;

        let mempool_queue_size = IntGauge::with_opts(Opts::new(
            "mempool_queue_size",
            "Current number of transactions waiting in the FIFO queue",
        ))?;
        registry.register(Box::new(mempool_queue_size.clone()))?;

        Ok(Self {
            blocks_applied_total,
            blocks_rejected_total,
            fork_events_total,
            block_process_seconds,
            mempool_pool_size,
            mempool_queue_size,
        })
    }
}

/// Wrapper around a Prometheus registry and the consensus metrics.
///
/// This is the main handle you pass around in the node. It can be wrapped
/// in an [`Arc`] and shared across threads/tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub consensus: ConsensusMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// and registers the consensus metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("chain".to_string()), None)?;
        let consensus = ConsensusMetrics::register(&registry)?;
        Ok(Self {
            registry,
            consensus,
        })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            eprintln!("failed to encode Prometheus metrics: {e}");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// The server listens on `addr` and serves `GET /metrics` with the
/// Prometheus text exposition format. All other paths return 404.
///
/// This function is `async` and is intended to be spawned onto a Tokio
/// runtime, e.g.:
///
/// ```ignore
/// let registry = Arc::new(MetricsRegistry::new()?);
/// let addr: SocketAddr = "127.0.0.1:9898".parse()?;
/// tokio::spawn(run_prometheus_http_server(registry.clone(), addr));
/// ```
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                eprintln!("prometheus HTTP server error: {err}");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let body = metrics.gather_text();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(body)))
                .unwrap())
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("not found")))
            .unwrap()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn consensus_metrics_register_and_record() {
        let registry = Registry::new();
        let metrics = ConsensusMetrics::register(&registry).expect("register metrics");

        metrics.blocks_applied_total.inc();
        metrics.blocks_rejected_total.with_label_values(&["signature"]).inc();
        metrics.fork_events_total.with_label_values(&["five"]).inc();
        metrics.block_process_seconds.observe(0.01);
        metrics.mempool_pool_size.set(3);
        metrics.mempool_queue_size.set(1);

        let metric_families = registry.gather();
        assert!(!metric_families.is_empty());
    }

    #[test]
    fn metrics_registry_gather_text_works() {
        let registry = MetricsRegistry::new().expect("create metrics registry");
        registry.consensus.blocks_applied_total.inc();
        let text = registry.gather_text();
        assert!(text.contains("consensus_blocks_applied_total"));
    }
}
