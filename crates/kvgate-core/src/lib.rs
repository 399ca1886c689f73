//! kvgate core: transport-agnostic wire contracts and the error surface.
//!
//! This crate defines the JSON request/response shapes of the gateway
//! endpoints and the error type shared by the gateway and its store backends.
//! It carries no HTTP or runtime dependencies so the contracts can be reused
//! by clients and test tooling.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed payloads surface as `GatewayError::BadRequest`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{ClientCode, GatewayError, Result};
