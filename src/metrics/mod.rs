//! Metrics and monitoring for the matchmaker
//!
//! Metrics are collected into a private Prometheus registry and can be
//! rendered as text; exposing them over a transport is left to the host.

pub mod collector;

pub use collector::{MatchMetrics, MetricsCollector, QueueMetrics};
