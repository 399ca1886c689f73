//! Store health probe.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use kvgate_core::protocol::{HealthResponse, HealthState};

use crate::obs::GatewayMetrics;
use crate::store::KvStore;

/// Result of one probe. `response_time_seconds` is
/// [`HealthStatus::UNREACHABLE`] when the store could not be reached.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthStatus {
    pub reachable: bool,
    pub response_time_seconds: f64,
    pub observed_at: SystemTime,
}

impl HealthStatus {
    pub const UNREACHABLE: f64 = -1.0;

    pub fn to_response(&self) -> HealthResponse {
        let timestamp = self
            .observed_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        HealthResponse {
            status: if self.reachable {
                HealthState::Up
            } else {
                HealthState::Down
            },
            response_time: self.response_time_seconds,
            timestamp,
        }
    }
}

pub struct HealthProber {
    store: Arc<dyn KvStore>,
    metrics: Arc<GatewayMetrics>,
    last_up: AtomicBool,
}

impl HealthProber {
    pub fn new(store: Arc<dyn KvStore>, metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            store,
            metrics,
            last_up: AtomicBool::new(true),
        }
    }

    /// Time a single `PING`. Any failure reports the store as down; only
    /// connectivity failures are expected here, anything else is logged as an
    /// error so it stands out.
    pub async fn probe(&self) -> HealthStatus {
        let observed_at = SystemTime::now();
        let started = Instant::now();

        match self.store.ping().await {
            Ok(()) => {
                let elapsed = started.elapsed();
                self.metrics.health_probe(elapsed);
                if !self.last_up.swap(true, Ordering::Relaxed) {
                    tracing::info!("store reachable again");
                }
                HealthStatus {
                    reachable: true,
                    response_time_seconds: elapsed.as_secs_f64(),
                    observed_at,
                }
            }
            Err(e) => {
                let was_up = self.last_up.swap(false, Ordering::Relaxed);
                if !e.is_connectivity() {
                    tracing::error!(error = %e, "health probe failed with a non-connectivity error");
                } else if was_up {
                    tracing::warn!(error = %e, "store unreachable");
                }
                HealthStatus {
                    reachable: false,
                    response_time_seconds: HealthStatus::UNREACHABLE,
                    observed_at,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obs::gateway::HEALTH_PROBE_SECONDS;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn reachable_store_is_up() {
        let metrics = Arc::new(GatewayMetrics::new());
        let prober = HealthProber::new(Arc::new(MemoryStore::new()), Arc::clone(&metrics));
        let status = prober.probe().await;
        assert!(status.reachable);
        assert!(status.response_time_seconds >= 0.0);
        assert_eq!(status.to_response().status, HealthState::Up);
        assert_eq!(metrics.registry().histogram_count(HEALTH_PROBE_SECONDS, &[]), 1);
    }

    #[tokio::test]
    async fn disconnected_store_is_down_with_sentinel() {
        let store = Arc::new(MemoryStore::new());
        store.set_online(false);
        let metrics = Arc::new(GatewayMetrics::new());
        let prober = HealthProber::new(store, Arc::clone(&metrics));

        let status = prober.probe().await;
        assert!(!status.reachable);
        assert_eq!(status.response_time_seconds, -1.0);

        let body = status.to_response();
        assert_eq!(body.status, HealthState::Down);
        assert_eq!(body.response_time, -1.0);
        assert!(body.timestamp > 0);
        assert_eq!(metrics.registry().histogram_count(HEALTH_PROBE_SECONDS, &[]), 0);
    }
}
