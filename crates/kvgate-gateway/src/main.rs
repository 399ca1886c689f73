//! kvgate gateway binary.
//!
//! - HTTP endpoints: /get/:key, /set, /search, /delete, /health, /metrics
//! - Optional dedicated metrics listener
//! - Background key-count sampler, stopped after the server drains
//! - Graceful shutdown on SIGINT/SIGTERM

use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

use kvgate_core::error::{GatewayError, Result};
use kvgate_gateway::{app_state::AppState, config, server};

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = config::load()?;
    let listen = cfg.gateway.listen_addr()?;
    let metrics_listen = cfg.gateway.metrics_addr()?;

    let state = AppState::from_config(cfg)?;
    let listener = TcpListener::bind(listen)
        .await
        .map_err(|e| GatewayError::Internal(format!("bind {listen} failed: {e}")))?;
    let metrics_listener = match metrics_listen {
        Some(addr) => {
            let listener = TcpListener::bind(addr)
                .await
                .map_err(|e| GatewayError::Internal(format!("bind {addr} failed: {e}")))?;
            tracing::info!(%addr, "metrics listener starting");
            Some(listener)
        }
        None => None,
    };
    tracing::info!(%listen, "kvgate-gateway starting");

    let sampler = state.spawn_sampler();

    let served = server::run(state, listener, metrics_listener, shutdown_signal()).await;

    sampler.stop().await;
    tracing::info!("kvgate-gateway stopped");
    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
