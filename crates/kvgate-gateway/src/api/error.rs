//! HTTP mapping of `GatewayError`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use kvgate_core::error::{ClientCode, GatewayError};
use kvgate_core::protocol::ErrorBody;

use crate::obs::Endpoint;
use crate::store::StoreError;

/// Handler error. Validation failures are 4xx and not retryable; store
/// failures are 503 and may be retried by the caller.
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.client_code() {
            ClientCode::BadRequest => StatusCode::BAD_REQUEST,
            ClientCode::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn log(&self, endpoint: Endpoint) {
        match self.0.client_code() {
            ClientCode::BadRequest => {
                tracing::debug!(endpoint = endpoint.as_str(), error = %self.0, "rejected request")
            }
            _ => tracing::error!(endpoint = endpoint.as_str(), error = %self.0, "request failed"),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody::from(&self.0))).into_response()
    }
}
