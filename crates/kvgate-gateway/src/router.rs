//! Axum router wiring.

use axum::{
    routing::{get, post},
    Router,
};

use crate::{api, app_state::AppState, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/get/:key", get(api::get_value))
        .route("/set", post(api::set_value))
        .route("/search", get(api::search))
        .route("/delete", post(api::delete_value))
        .route("/health", get(ops::health))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}

/// Router for the optional dedicated metrics listener.
pub fn build_metrics_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
