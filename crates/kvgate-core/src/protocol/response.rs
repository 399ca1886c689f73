//! Outbound bodies.

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// `GET /get/{key}` hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueResponse {
    pub value: String,
}

/// Status message for `/set` and `/delete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub const KEY_SET: &'static str = "key set";
    pub const KEY_DELETED: &'static str = "key deleted";
    pub const KEY_NOT_FOUND: &'static str = "key not found";

    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthState {
    Up,
    Down,
}

/// `GET /health` body. `response_time` is `-1.0` when the store is down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthState,
    #[serde(rename = "responseTime")]
    pub response_time: f64,
    /// Unix seconds at which the probe started.
    pub timestamp: i64,
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl From<&GatewayError> for ErrorBody {
    fn from(err: &GatewayError) -> Self {
        Self {
            error: err.client_code().as_str().to_string(),
            message: err.to_string(),
        }
    }
}
