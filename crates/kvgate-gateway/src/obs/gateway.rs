//! Gateway metric series and per-request bookkeeping.

use std::time::{Duration, Instant};

use super::metrics::MetricsRegistry;

pub const REQUESTS_TOTAL: &str = "kvgate_requests_total";
pub const RESPONSES_TOTAL: &str = "kvgate_http_responses_total";
pub const REQUEST_LATENCY: &str = "kvgate_request_latency_seconds";
pub const CACHE_HITS_TOTAL: &str = "kvgate_cache_hits_total";
pub const DB_KEYS_TOTAL: &str = "db_keys_total";
pub const HEALTH_PROBE_SECONDS: &str = "kvgate_health_probe_seconds";
pub const SAMPLER_FAILURES_TOTAL: &str = "kvgate_sampler_failures_total";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Get,
    Set,
    Search,
    Delete,
    Health,
    Metrics,
}

impl Endpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::Get => "get",
            Endpoint::Set => "set",
            Endpoint::Search => "search",
            Endpoint::Delete => "delete",
            Endpoint::Health => "health",
            Endpoint::Metrics => "metrics",
        }
    }

    /// Health and metrics scrapes are counted but not timed.
    fn is_timed(self) -> bool {
        !matches!(self, Endpoint::Health | Endpoint::Metrics)
    }
}

#[derive(Default)]
pub struct GatewayMetrics {
    registry: MetricsRegistry,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }

    /// Count a received request and start its latency clock.
    pub fn begin(&self, endpoint: Endpoint) -> RequestTimer<'_> {
        self.registry.increment(REQUESTS_TOTAL, &[]);
        RequestTimer {
            metrics: self,
            endpoint,
            started: Instant::now(),
        }
    }

    /// The requested key was present in the store.
    pub fn cache_hit(&self) {
        self.registry.increment(CACHE_HITS_TOTAL, &[]);
    }

    pub fn cache_hits(&self) -> u64 {
        self.registry.counter_value(CACHE_HITS_TOTAL, &[])
    }

    pub fn set_key_count(&self, count: usize) {
        self.registry.set_gauge(DB_KEYS_TOTAL, &[], count as f64);
    }

    pub fn key_count(&self) -> f64 {
        self.registry.gauge_value(DB_KEYS_TOTAL, &[])
    }

    pub fn sampler_failure(&self) {
        self.registry.increment(SAMPLER_FAILURES_TOTAL, &[]);
    }

    pub fn health_probe(&self, elapsed: Duration) {
        self.registry.observe_duration(HEALTH_PROBE_SECONDS, &[], elapsed);
    }

    pub fn render(&self) -> String {
        self.registry.snapshot()
    }
}

/// Started by [`GatewayMetrics::begin`]. Dropping it without calling
/// [`RequestTimer::finish`] records nothing beyond the request count, which is
/// what happens when a caller abandons the request mid-flight.
pub struct RequestTimer<'a> {
    metrics: &'a GatewayMetrics,
    endpoint: Endpoint,
    started: Instant,
}

impl RequestTimer<'_> {
    /// Tag the endpoint+status counter and, for timed endpoints, record the
    /// latency from receipt to now.
    pub fn finish(self, status: u16) {
        let endpoint = self.endpoint.as_str();
        let status = status.to_string();
        self.metrics
            .registry
            .increment(RESPONSES_TOTAL, &[("endpoint", endpoint), ("status", &status)]);
        if self.endpoint.is_timed() {
            self.metrics.registry.observe_duration(
                REQUEST_LATENCY,
                &[("endpoint", endpoint)],
                self.started.elapsed(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_records_status_and_latency() {
        let m = GatewayMetrics::new();
        m.begin(Endpoint::Get).finish(404);
        let r = m.registry();
        assert_eq!(r.counter_value(REQUESTS_TOTAL, &[]), 1);
        assert_eq!(
            r.counter_value(RESPONSES_TOTAL, &[("endpoint", "get"), ("status", "404")]),
            1
        );
        assert_eq!(r.histogram_count(REQUEST_LATENCY, &[("endpoint", "get")]), 1);
    }

    #[test]
    fn health_is_counted_but_not_timed() {
        let m = GatewayMetrics::new();
        m.begin(Endpoint::Health).finish(200);
        let r = m.registry();
        assert_eq!(
            r.counter_value(RESPONSES_TOTAL, &[("endpoint", "health"), ("status", "200")]),
            1
        );
        assert_eq!(r.histogram_count(REQUEST_LATENCY, &[("endpoint", "health")]), 0);
    }

    #[test]
    fn abandoned_request_records_no_response() {
        let m = GatewayMetrics::new();
        drop(m.begin(Endpoint::Set));
        let r = m.registry();
        assert_eq!(r.counter_value(REQUESTS_TOTAL, &[]), 1);
        assert_eq!(
            r.counter_value(RESPONSES_TOTAL, &[("endpoint", "set"), ("status", "200")]),
            0
        );
        assert_eq!(r.histogram_count(REQUEST_LATENCY, &[("endpoint", "set")]), 0);
    }
}
