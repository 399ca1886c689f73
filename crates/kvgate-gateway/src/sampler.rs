//! Background key-count sampler.
//!
//! Periodically enumerates the store and publishes the key count as the
//! `db_keys_total` gauge. The full enumeration is O(keys), so it runs on its
//! own schedule and never on a request path; the gauge lags the true count by
//! at most one interval.
//!
//! The gauge is only written after an enumeration completes. A failed or
//! cancelled cycle leaves the previous value in place.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::obs::GatewayMetrics;
use crate::store::{KvStore, StoreResult};

/// Floor for the sampling period; `tokio::time::interval` rejects zero.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

pub struct KeyCountSampler {
    store: Arc<dyn KvStore>,
    metrics: Arc<GatewayMetrics>,
    interval: Duration,
}

impl KeyCountSampler {
    pub fn new(store: Arc<dyn KvStore>, metrics: Arc<GatewayMetrics>, interval: Duration) -> Self {
        Self {
            store,
            metrics,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    /// Run one enumeration and publish its length.
    pub async fn sample_once(&self) -> StoreResult<usize> {
        let keys = self.store.enumerate_keys().await?;
        let count = keys.len();
        self.metrics.set_key_count(count);
        Ok(count)
    }

    async fn cycle(&self) {
        match self.sample_once().await {
            Ok(count) => tracing::debug!(count, "key count sampled"),
            Err(e) => {
                self.metrics.sampler_failure();
                tracing::warn!(error = %e, "key count sample failed, keeping previous value");
            }
        }
    }

    /// Start the sampling loop. The first cycle runs immediately.
    pub fn spawn(self) -> SamplerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let interval = self.interval;

        let task = tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = tick.tick() => {}
                }
                // An in-flight enumeration is abandoned on stop.
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = self.cycle() => {}
                }
            }
            tracing::info!("key count sampler stopped");
        });

        tracing::info!(interval_ms = interval.as_millis() as u64, "key count sampler started");
        SamplerHandle { stop_tx, task }
    }
}

/// Owner of a running sampler. Dropping the handle also stops the loop.
pub struct SamplerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SamplerHandle {
    /// Signal the loop to stop and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "key count sampler task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obs::gateway::SAMPLER_FAILURES_TOTAL;
    use crate::store::MemoryStore;

    async fn setup(keys: usize) -> (Arc<MemoryStore>, Arc<GatewayMetrics>) {
        let store = Arc::new(MemoryStore::new());
        for i in 0..keys {
            store.set(&format!("k{i}"), "v").await.unwrap();
        }
        (store, Arc::new(GatewayMetrics::new()))
    }

    async fn wait_for_count(metrics: &GatewayMetrics, want: f64) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while metrics.key_count() != want {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("gauge never reached expected value");
    }

    #[tokio::test]
    async fn sample_once_publishes_count() {
        let (store, metrics) = setup(4).await;
        let sampler = KeyCountSampler::new(store, Arc::clone(&metrics), Duration::from_secs(10));
        assert_eq!(sampler.sample_once().await.unwrap(), 4);
        assert_eq!(metrics.key_count(), 4.0);
    }

    #[tokio::test]
    async fn failed_cycle_keeps_previous_value() {
        let (store, metrics) = setup(2).await;
        let sampler = KeyCountSampler::new(
            Arc::clone(&store) as Arc<dyn KvStore>,
            Arc::clone(&metrics),
            Duration::from_secs(10),
        );
        sampler.cycle().await;
        assert_eq!(metrics.key_count(), 2.0);

        store.set("extra", "v").await.unwrap();
        store.set_online(false);
        sampler.cycle().await;
        assert_eq!(metrics.key_count(), 2.0);
        assert_eq!(metrics.registry().counter_value(SAMPLER_FAILURES_TOTAL, &[]), 1);

        store.set_online(true);
        sampler.cycle().await;
        assert_eq!(metrics.key_count(), 3.0);
    }

    #[tokio::test]
    async fn zero_interval_is_clamped() {
        let (store, metrics) = setup(3).await;
        let handle = KeyCountSampler::new(store, Arc::clone(&metrics), Duration::ZERO).spawn();
        wait_for_count(&metrics, 3.0).await;
        assert!(!handle.is_finished());
        handle.stop().await;
    }

    #[tokio::test]
    async fn loop_survives_failures_and_stops_on_signal() {
        let (store, metrics) = setup(1).await;
        store.set_online(false);
        let handle = KeyCountSampler::new(
            Arc::clone(&store) as Arc<dyn KvStore>,
            Arc::clone(&metrics),
            Duration::from_millis(10),
        )
        .spawn();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        assert!(metrics.registry().counter_value(SAMPLER_FAILURES_TOTAL, &[]) >= 1);

        store.set_online(true);
        wait_for_count(&metrics, 1.0).await;

        handle.stop().await;
        store.set("late", "v").await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(metrics.key_count(), 1.0);
    }
}
