//! Key-value endpoints.
//!
//! - `GET  /get/{key}` : fetch a value (404 `{}` when absent)
//! - `POST /set`       : `{key, value}` unconditional overwrite
//! - `GET  /search`    : `?prefix=` or `?suffix=` (prefix wins if both)
//! - `POST /delete`    : `{key}`, "key not found" is not an error
//!
//! Every request goes through [`instrumented`], which counts it on receipt and
//! tags status and latency only once a response exists.

pub mod error;

use std::future::Future;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use kvgate_core::error::GatewayError;
use kvgate_core::protocol::{DeleteRequest, MessageResponse, SearchQuery, SetRequest, ValueResponse};

use crate::app_state::AppState;
use crate::obs::Endpoint;

pub use error::ApiError;

pub(crate) async fn instrumented<F, R>(state: &AppState, endpoint: Endpoint, fut: F) -> Response
where
    F: Future<Output = Result<R, ApiError>>,
    R: IntoResponse,
{
    let timer = state.metrics().begin(endpoint);
    let resp = match fut.await {
        Ok(r) => r.into_response(),
        Err(e) => {
            e.log(endpoint);
            e.into_response()
        }
    };
    timer.finish(resp.status().as_u16());
    resp
}

pub async fn get_value(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Response {
    instrumented(&state, Endpoint::Get, async {
        let Path(key) = path.map_err(|e| ApiError(GatewayError::BadRequest(e.body_text())))?;
        // Single fetch-if-present: no window between an existence check and the read.
        let resp = match state.store().get(&key).await? {
            Some(value) => {
                state.metrics().cache_hit();
                Json(ValueResponse { value }).into_response()
            }
            None => (StatusCode::NOT_FOUND, Json(json!({}))).into_response(),
        };
        Ok::<_, ApiError>(resp)
    })
    .await
}

pub async fn set_value(
    State(state): State<AppState>,
    body: Result<Json<SetRequest>, JsonRejection>,
) -> Response {
    instrumented(&state, Endpoint::Set, async {
        let Json(req) = body.map_err(json_rejection)?;
        let (key, value) = req.into_parts()?;
        state.store().set(&key, &value).await?;
        Ok::<_, ApiError>(Json(MessageResponse::new(MessageResponse::KEY_SET)))
    })
    .await
}

pub async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Response {
    instrumented(&state, Endpoint::Search, async {
        let Query(q) = query.map_err(|e| ApiError(GatewayError::BadRequest(e.body_text())))?;
        let found = state.search().search(q.pattern()).await?;
        Ok::<_, ApiError>(Json(found))
    })
    .await
}

pub async fn delete_value(
    State(state): State<AppState>,
    body: Result<Json<DeleteRequest>, JsonRejection>,
) -> Response {
    instrumented(&state, Endpoint::Delete, async {
        let Json(req) = body.map_err(json_rejection)?;
        let key = req.into_key()?;
        // Single delete-if-present reporting whether the key existed.
        let msg = if state.store().delete(&key).await? {
            state.metrics().cache_hit();
            MessageResponse::KEY_DELETED
        } else {
            MessageResponse::KEY_NOT_FOUND
        };
        Ok::<_, ApiError>(Json(MessageResponse::new(msg)))
    })
    .await
}

fn json_rejection(e: JsonRejection) -> ApiError {
    ApiError(GatewayError::BadRequest(e.body_text()))
}
