//! kvgate gateway library entry.
//!
//! An instrumented HTTP gateway in front of a key-value store: get/set/
//! search/delete endpoints, a health probe, a background key-count sampler,
//! and a Prometheus-style metrics registry. It is intended to be consumed by
//! the binary (`main.rs`) and by integration tests.

pub mod api;
pub mod app_state;
pub mod config;
pub mod health;
pub mod obs;
pub mod ops;
pub mod router;
pub mod sampler;
pub mod search;
pub mod server;
pub mod store;
