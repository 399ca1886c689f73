//! Gateway config loader (strict parsing + environment overrides).
//!
//! The YAML file is read first, then the environment variables below replace
//! individual values, then the result is validated:
//!
//! | Variable                 | Overrides                       |
//! |--------------------------|---------------------------------|
//! | `HOST`, `PORT`           | `gateway.listen` host / port    |
//! | `METRICS_PORT`           | `gateway.metrics_listen` port   |
//! | `REDIS_HOST`             | `store.host`                    |
//! | `REDIS_PORT`             | `store.port`                    |
//! | `KEY_SAMPLE_INTERVAL_MS` | `sampler.interval_ms`           |

pub mod schema;

use std::fs;
use std::io::ErrorKind;

use kvgate_core::error::{GatewayError, Result};

pub use schema::{
    GatewayConfig, GatewaySection, SamplerSection, SearchSection, StoreBackend, StoreSection,
};

pub const CONFIG_PATH_ENV: &str = "KVGATE_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "kvgate.yaml";

/// Load using the process environment: file from `KVGATE_CONFIG` (or the
/// default path, which may be absent), then env overrides, then validation.
pub fn load() -> Result<GatewayConfig> {
    let explicit = std::env::var(CONFIG_PATH_ENV).ok();
    let path = explicit.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);

    let mut cfg = match fs::read_to_string(path) {
        Ok(s) => parse(&s)?,
        Err(e) if e.kind() == ErrorKind::NotFound && explicit.is_none() => {
            tracing::info!(path, "no config file, using defaults");
            GatewayConfig::default()
        }
        Err(e) => {
            return Err(GatewayError::Internal(format!("read config failed ({path}): {e}")));
        }
    };

    apply_env_overrides(&mut cfg, |k| std::env::var(k).ok())?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| GatewayError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg = parse(s)?;
    cfg.validate()?;
    Ok(cfg)
}

fn parse(s: &str) -> Result<GatewayConfig> {
    serde_yaml::from_str(s).map_err(|e| GatewayError::BadRequest(format!("invalid yaml: {e}")))
}

/// Replace config values from environment-style lookups. Unset variables
/// leave the file value alone; unparseable numbers are rejected.
pub fn apply_env_overrides<F>(cfg: &mut GatewayConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let host = lookup("HOST");
    let port = lookup("PORT");
    if host.is_some() || port.is_some() {
        let (cur_host, cur_port) = split_host_port(&cfg.gateway.listen);
        let port = match port {
            Some(p) => parse_num::<u16>("PORT", &p)?.to_string(),
            None => cur_port,
        };
        cfg.gateway.listen = format!("{}:{}", host.unwrap_or(cur_host), port);
    }

    if let Some(p) = lookup("METRICS_PORT") {
        let port = parse_num::<u16>("METRICS_PORT", &p)?;
        let (host, _) = split_host_port(&cfg.gateway.listen);
        cfg.gateway.metrics_listen = Some(format!("{host}:{port}"));
    }

    if let Some(h) = lookup("REDIS_HOST") {
        cfg.store.host = h;
    }
    if let Some(p) = lookup("REDIS_PORT") {
        cfg.store.port = parse_num("REDIS_PORT", &p)?;
    }
    if let Some(ms) = lookup("KEY_SAMPLE_INTERVAL_MS") {
        cfg.sampler.interval_ms = parse_num("KEY_SAMPLE_INTERVAL_MS", &ms)?;
    }
    Ok(())
}

fn split_host_port(listen: &str) -> (String, String) {
    match listen.rsplit_once(':') {
        Some((h, p)) => (h.to_string(), p.to_string()),
        None => (listen.to_string(), String::new()),
    }
}

fn parse_num<T: std::str::FromStr>(var: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| GatewayError::BadRequest(format!("{var} must be a number, got {raw:?}")))
}
