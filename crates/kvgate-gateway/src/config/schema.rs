use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;
use kvgate_core::error::{GatewayError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub store: StoreSection,

    #[serde(default)]
    pub sampler: SamplerSection,

    #[serde(default)]
    pub search: SearchSection,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            version: 1,
            gateway: GatewaySection::default(),
            store: StoreSection::default(),
            sampler: SamplerSection::default(),
            search: SearchSection::default(),
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(GatewayError::BadRequest(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.gateway.validate()?;
        self.store.validate()?;
        self.sampler.validate()?;
        self.search.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Optional second listener serving only `/metrics`.
    #[serde(default)]
    pub metrics_listen: Option<String>,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            metrics_listen: None,
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        self.metrics_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        parse_addr("gateway.listen", &self.listen)
    }

    pub fn metrics_addr(&self) -> Result<Option<SocketAddr>> {
        self.metrics_listen
            .as_deref()
            .map(|s| parse_addr("gateway.metrics_listen", s))
            .transpose()
    }
}

fn parse_addr(field: &str, s: &str) -> Result<SocketAddr> {
    s.parse()
        .map_err(|_| GatewayError::BadRequest(format!("{field} must be a valid SocketAddr: {s}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    #[serde(default = "default_store_host")]
    pub host: String,

    #[serde(default = "default_store_port")]
    pub port: u16,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            host: default_store_host(),
            port: default_store_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            response_timeout_ms: default_response_timeout_ms(),
        }
    }
}

impl StoreSection {
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(GatewayError::BadRequest("store.host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(GatewayError::BadRequest("store.port must not be 0".into()));
        }
        if !(10..=60_000).contains(&self.connect_timeout_ms) {
            return Err(GatewayError::BadRequest(
                "store.connect_timeout_ms must be between 10 and 60000".into(),
            ));
        }
        if !(10..=60_000).contains(&self.response_timeout_ms) {
            return Err(GatewayError::BadRequest(
                "store.response_timeout_ms must be between 10 and 60000".into(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplerSection {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for SamplerSection {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl SamplerSection {
    pub fn validate(&self) -> Result<()> {
        if !(100..=3_600_000).contains(&self.interval_ms) {
            return Err(GatewayError::BadRequest(
                "sampler.interval_ms must be between 100 and 3600000".into(),
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchSection {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

impl SearchSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=100_000).contains(&self.batch_size) {
            return Err(GatewayError::BadRequest(
                "search.batch_size must be between 1 and 100000".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_backend() -> StoreBackend {
    StoreBackend::Redis
}
fn default_store_host() -> String {
    "127.0.0.1".into()
}
fn default_store_port() -> u16 {
    6379
}
fn default_connect_timeout_ms() -> u64 {
    2000
}
fn default_response_timeout_ms() -> u64 {
    2000
}
fn default_interval_ms() -> u64 {
    10_000
}
fn default_batch_size() -> usize {
    500
}
