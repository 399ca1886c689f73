//! Protocol modules (HTTP JSON bodies).
//!
//! - `request`: inbound payloads and query strings, with validation.
//! - `response`: outbound bodies for every endpoint.
//!
//! Request payloads deserialize leniently (every field optional) and are then
//! validated explicitly, so a missing field is reported as
//! `GatewayError::BadRequest` with the field name rather than a raw serde
//! message.

pub mod request;
pub mod response;

pub use request::{DeleteRequest, SearchPattern, SearchQuery, SetRequest};
pub use response::{ErrorBody, HealthResponse, HealthState, MessageResponse, ValueResponse};
