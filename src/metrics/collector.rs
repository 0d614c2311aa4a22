//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the matchmaker using its own
//! Prometheus registry.

use crate::types::MatchSource;
use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Main metrics collector for the matchmaking service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Queue-related metrics
    queue_metrics: QueueMetrics,

    /// Match-related metrics
    match_metrics: MatchMetrics,
}

/// Queue-related metrics
#[derive(Clone)]
pub struct QueueMetrics {
    /// Total players accepted into the queue
    pub players_queued_total: IntCounter,

    /// Joins rejected because the player was already queued
    pub duplicate_joins_total: IntCounter,

    /// Players currently waiting in queue
    pub players_waiting: IntGauge,

    /// Time between joining and being matched
    pub queue_wait_time_seconds: Histogram,
}

/// Match-related metrics
#[derive(Clone)]
pub struct MatchMetrics {
    /// Matches found, by path
    pub matches_found_total: IntCounterVec,

    /// Players leaving the queue through a match, by path
    pub players_matched_total: IntCounterVec,

    /// Number of players per match
    pub match_size: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with its own registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let queue_metrics = QueueMetrics::new(&registry)?;
        let match_metrics = MatchMetrics::new(&registry)?;

        Ok(Self {
            registry,
            queue_metrics,
            match_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get queue metrics
    pub fn queue(&self) -> &QueueMetrics {
        &self.queue_metrics
    }

    /// Get match metrics
    pub fn matches(&self) -> &MatchMetrics {
        &self.match_metrics
    }

    /// Record a player entering the queue
    pub fn record_player_queued(&self) {
        self.queue_metrics.players_queued_total.inc();
    }

    /// Publish the pool size. Callers hold the pool lock so the last write wins
    /// in lock order.
    pub fn set_players_waiting(&self, players_waiting: usize) {
        self.queue_metrics
            .players_waiting
            .set(players_waiting as i64);
    }

    /// Record a rejected duplicate join
    pub fn record_duplicate_join(&self) {
        self.queue_metrics.duplicate_joins_total.inc();
    }

    /// Record a match leaving the queue
    pub fn record_match(&self, source: MatchSource, wait_times: &[Duration]) {
        let label = source.to_string();

        self.match_metrics
            .matches_found_total
            .with_label_values(&[label.as_str()])
            .inc();
        self.match_metrics
            .players_matched_total
            .with_label_values(&[label.as_str()])
            .inc_by(wait_times.len() as u64);
        self.match_metrics.match_size.observe(wait_times.len() as f64);

        for wait in wait_times {
            self.queue_metrics
                .queue_wait_time_seconds
                .observe(wait.as_secs_f64());
        }
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn gather_text(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl QueueMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let players_queued_total =
            IntCounter::new("matchmaker_players_queued_total", "Total players queued")?;
        registry.register(Box::new(players_queued_total.clone()))?;

        let duplicate_joins_total = IntCounter::new(
            "matchmaker_duplicate_joins_total",
            "Joins rejected because the player was already queued",
        )?;
        registry.register(Box::new(duplicate_joins_total.clone()))?;

        let players_waiting = IntGauge::new(
            "matchmaker_players_waiting",
            "Players currently waiting in queue",
        )?;
        registry.register(Box::new(players_waiting.clone()))?;

        let queue_wait_time_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "matchmaker_queue_wait_time_seconds",
                "Time spent in queue before being matched",
            )
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]),
        )?;
        registry.register(Box::new(queue_wait_time_seconds.clone()))?;

        Ok(Self {
            players_queued_total,
            duplicate_joins_total,
            players_waiting,
            queue_wait_time_seconds,
        })
    }
}

impl MatchMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let matches_found_total = IntCounterVec::new(
            Opts::new("matchmaker_matches_found_total", "Total matches found"),
            &["source"],
        )?;
        registry.register(Box::new(matches_found_total.clone()))?;

        let players_matched_total = IntCounterVec::new(
            Opts::new("matchmaker_players_matched_total", "Total players matched"),
            &["source"],
        )?;
        registry.register(Box::new(players_matched_total.clone()))?;

        let match_size = Histogram::with_opts(
            HistogramOpts::new("matchmaker_match_size", "Players per match")
                .buckets(vec![1.0, 2.0, 3.0, 4.0, 6.0, 8.0, 10.0, 16.0, 32.0]),
        )?;
        registry.register(Box::new(match_size.clone()))?;

        Ok(Self {
            matches_found_total,
            players_matched_total,
            match_size,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}
