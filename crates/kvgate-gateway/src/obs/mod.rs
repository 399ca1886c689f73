//! In-process metrics.
//!
//! `metrics` holds the generic registry (counters, gauges, histograms) and its
//! Prometheus text rendering. `gateway` names the gateway's own series and
//! wraps the per-request bookkeeping around the registry.

pub mod gateway;
pub mod metrics;

pub use gateway::{Endpoint, GatewayMetrics, RequestTimer};
pub use metrics::MetricsRegistry;
