//! Top-level configuration for a chain node.
//!
//! This module aggregates configuration for:
//!
//! - consensus/slot timing and limits (`ChainConfig`'s own fields),
//! - storage (RocksDB path and creation flags),
//! - the Prometheus metrics exporter (enable flag + listen address).

use std::net::SocketAddr;

use crate::storage::RocksDbConfig;

/// Per-transaction-type base fees.
#[derive(Clone, Copy, Debug)]
pub struct Fees {
    pub send: u64,
    pub vote: u64,
    pub stake: u64,
    pub delegate: u64,
    pub signature: u64,
    pub register: u64,
}

impl Default for Fees {
    fn default() -> Self {
        Self {
            send: 10_000_000,
            vote: 100_000_000,
            stake: 10_000_000,
            delegate: 2_500_000_000,
            signature: 500_000_000,
            register: 500_000_000,
        }
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Whether to run a `/metrics` HTTP exporter.
    pub enabled: bool,
    /// Address to bind the metrics HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        let addr: SocketAddr = "127.0.0.1:9898"
            .parse()
            .expect("hard-coded metrics listen address should parse");
        Self {
            enabled: true,
            listen_addr: addr,
        }
    }
}

/// Top-level configuration for a chain node.
///
/// Aggregates the slot/round timing constants, per-block limits, the
/// fee table, persistent storage configuration, and the metrics
/// exporter configuration.
#[derive(Clone, Debug)]
pub struct ChainConfig {
    /// UTC unix-seconds anchor that slot numbers are computed relative to.
    pub epoch_time: i64,
    /// Duration of one slot, in seconds.
    pub slot_interval: i64,
    /// Number of active delegates forging in a round.
    pub active_delegates_count: usize,
    pub max_transactions_per_block: u32,
    /// Height below which forged-slot bookkeeping is skipped.
    pub min_round_block_height: u64,
    pub current_block_version: u32,
    /// Size of the in-memory sliding window of recent blocks (C6).
    pub max_block_in_memory: usize,
    pub fees: Fees,
    pub max_delegate_username_length: usize,
    pub storage: RocksDbConfig,
    pub metrics: MetricsConfig,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            epoch_time: 1_464_109_200,
            slot_interval: 10,
            active_delegates_count: 101,
            max_transactions_per_block: 25,
            min_round_block_height: 101,
            current_block_version: 0,
            max_block_in_memory: 100,
            fees: Fees::default(),
            max_delegate_username_length: 20,
            storage: RocksDbConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}
