//! Shared application state for the kvgate gateway.
//!
//! Everything here is constructed once at startup and shared by handlers via
//! `Arc`: the store client, the metrics registry, the search engine, and the
//! health prober. Handlers never share anything mutable except the registry.

use std::sync::Arc;

use kvgate_core::error::Result;

use crate::config::{GatewayConfig, StoreBackend};
use crate::health::HealthProber;
use crate::obs::GatewayMetrics;
use crate::sampler::{KeyCountSampler, SamplerHandle};
use crate::search::SearchEngine;
use crate::store::{KvStore, MemoryStore, RedisStore};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    store: Arc<dyn KvStore>,
    metrics: Arc<GatewayMetrics>,
    search: SearchEngine,
    prober: HealthProber,
}

impl AppState {
    /// Build state with the store backend named in the config.
    pub fn from_config(cfg: GatewayConfig) -> Result<Self> {
        let store: Arc<dyn KvStore> = match cfg.store.backend {
            StoreBackend::Redis => {
                let redis = RedisStore::new(
                    &cfg.store.host,
                    cfg.store.port,
                    cfg.store.connect_timeout(),
                    cfg.store.response_timeout(),
                )?;
                tracing::info!(addr = %redis.addr(), "using redis store");
                Arc::new(redis)
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store, data is not persisted");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::new(cfg, store))
    }

    /// Build state around an existing store (tests, embedding).
    pub fn new(cfg: GatewayConfig, store: Arc<dyn KvStore>) -> Self {
        let metrics = Arc::new(GatewayMetrics::new());
        let search = SearchEngine::new(Arc::clone(&store), cfg.search.batch_size);
        let prober = HealthProber::new(Arc::clone(&store), Arc::clone(&metrics));
        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                store,
                metrics,
                search,
                prober,
            }),
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn store(&self) -> &dyn KvStore {
        self.inner.store.as_ref()
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.inner.metrics
    }

    pub fn search(&self) -> &SearchEngine {
        &self.inner.search
    }

    pub fn prober(&self) -> &HealthProber {
        &self.inner.prober
    }

    /// Start the key-count sampler on the configured interval.
    pub fn spawn_sampler(&self) -> SamplerHandle {
        KeyCountSampler::new(
            Arc::clone(&self.inner.store),
            Arc::clone(&self.inner.metrics),
            self.inner.cfg.sampler.interval(),
        )
        .spawn()
    }
}
