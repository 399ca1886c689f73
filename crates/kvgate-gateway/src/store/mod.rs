//! Store client abstraction.
//!
//! The gateway never holds data itself: every read and write goes through a
//! [`KvStore`]. Backends:
//! - [`RedisStore`]: the production backend.
//! - [`MemoryStore`]: in-process map, used for local runs and tests.
//!
//! Single-key reads and deletes are atomic "if present" operations so the
//! gateway never checks existence and then acts on a stale answer.

pub mod memory;
pub mod redis;

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use kvgate_core::error::GatewayError;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Opaque scan position. `0` starts a scan; a returned `0` ends it.
pub type Cursor = u64;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection refused, dropped, timed out, or other I/O failure.
    #[error("store unreachable: {0}")]
    Unavailable(String),
    /// The store answered, but with an error.
    #[error("store error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => GatewayError::StoreUnavailable(msg),
            StoreError::Backend(msg) => GatewayError::Internal(msg),
        }
    }
}

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch the value if the key is present.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Unconditional overwrite.
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Delete if present. Returns whether the key existed.
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// One page of a cursor scan, at most roughly `count` keys. A key may be
    /// returned more than once across pages of the same scan.
    async fn scan(&self, cursor: Cursor, count: usize) -> StoreResult<(Cursor, Vec<String>)>;

    /// Bulk fetch. Each requested key is paired with its own value (or
    /// `None` if it vanished). An empty slice issues no store command.
    async fn get_many(&self, keys: &[String]) -> StoreResult<Vec<(String, Option<String>)>>;

    async fn ping(&self) -> StoreResult<()>;

    /// Every key currently in the store, deduplicated, in no particular order.
    async fn enumerate_keys(&self) -> StoreResult<Vec<String>> {
        let mut seen = HashSet::new();
        let mut cursor: Cursor = 0;
        loop {
            let (next, page) = self.scan(cursor, ENUMERATE_PAGE).await?;
            seen.extend(page);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(seen.into_iter().collect())
    }
}

const ENUMERATE_PAGE: usize = 1_000;
