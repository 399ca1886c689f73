//! Listener wiring: the main API listener plus the optional metrics listener.
//!
//! The metrics listener follows the main one down. It is stopped once the
//! main server returns, whether that was a graceful drain or an error.

use std::future::Future;

use tokio::net::TcpListener;
use tokio::sync::watch;

use kvgate_core::error::{GatewayError, Result};

use crate::app_state::AppState;
use crate::router;

pub async fn run<F>(
    state: AppState,
    listener: TcpListener,
    metrics_listener: Option<TcpListener>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (stop_tx, stop_rx) = watch::channel(false);

    let metrics_task = metrics_listener.map(|listener| {
        let app = router::build_metrics_router(state.clone());
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(wait_for(stop_rx))
                .await
            {
                tracing::error!(error = %e, "metrics listener failed");
            }
        })
    });

    let served = axum::serve(listener, router::build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| GatewayError::Internal(format!("server failed: {e}")));

    let _ = stop_tx.send(true);
    if let Some(task) = metrics_task {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "metrics listener task failed");
        }
    }
    served
}

async fn wait_for(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}
