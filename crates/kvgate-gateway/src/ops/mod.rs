//! Operational HTTP endpoints.
//!
//! - `/health`  : store reachability; `DOWN` is still a 200 response
//! - `/metrics` : Prometheus text format

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::api::{instrumented, ApiError};
use crate::app_state::AppState;
use crate::obs::Endpoint;

pub async fn health(State(state): State<AppState>) -> Response {
    instrumented(&state, Endpoint::Health, async {
        let status = state.prober().probe().await;
        Ok::<_, ApiError>(Json(status.to_response()))
    })
    .await
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    instrumented(&state, Endpoint::Metrics, async {
        Ok::<_, ApiError>(render_metrics(&state))
    })
    .await
}

fn render_metrics(state: &AppState) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics().render(),
    )
        .into_response()
}
