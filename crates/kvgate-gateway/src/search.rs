//! Prefix/suffix search over the key population.
//!
//! The keyspace is walked with a cursor scan in bounded batches. Each batch is
//! filtered client-side and its matches resolved with one bulk fetch, so
//! memory per step is bounded by the batch size rather than the store size.
//! Total cost is still linear in the number of keys in the store.
//!
//! [`SearchEngine::pages`] exposes the per-batch results as a stream;
//! [`SearchEngine::search`] collects them into a single map.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::stream::{self, Stream, TryStreamExt};

use kvgate_core::protocol::SearchPattern;

use crate::store::{Cursor, KvStore, StoreResult};

/// Matched key → current value. Order is irrelevant.
pub type SearchResult = HashMap<String, String>;

/// Matches resolved from one scan batch.
pub type SearchPage = Vec<(String, String)>;

pub struct SearchEngine {
    store: Arc<dyn KvStore>,
    batch_size: usize,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn KvStore>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn search_by_prefix(&self, prefix: &str) -> StoreResult<SearchResult> {
        self.collect(SearchPattern::Prefix(prefix.to_string())).await
    }

    pub async fn search_by_suffix(&self, suffix: &str) -> StoreResult<SearchResult> {
        self.collect(SearchPattern::Suffix(suffix.to_string())).await
    }

    /// No pattern yields an empty result without touching the store.
    pub async fn search(&self, pattern: Option<SearchPattern>) -> StoreResult<SearchResult> {
        match pattern {
            Some(p) => self.collect(p).await,
            None => Ok(SearchResult::new()),
        }
    }

    /// One item per scan batch. Batches without matches yield empty pages.
    /// Keys that disappear between the scan and the fetch are dropped.
    pub fn pages(
        &self,
        pattern: SearchPattern,
    ) -> impl Stream<Item = StoreResult<SearchPage>> + Send + 'static {
        let store = Arc::clone(&self.store);
        let batch = self.batch_size;

        stream::try_unfold(Some(0 as Cursor), move |cursor| {
            let store = Arc::clone(&store);
            let pattern = pattern.clone();
            async move {
                let Some(cursor) = cursor else {
                    return Ok(None);
                };
                let (next, keys) = store.scan(cursor, batch).await?;
                let matched: Vec<String> = keys.into_iter().filter(|k| pattern.matches(k)).collect();

                let requested = matched.len();
                let page: SearchPage = store
                    .get_many(&matched)
                    .await?
                    .into_iter()
                    .filter_map(|(k, v)| v.map(|v| (k, v)))
                    .collect();
                if page.len() < requested {
                    tracing::debug!(dropped = requested - page.len(), "keys vanished before fetch");
                }

                let next = (next != 0).then_some(next);
                Ok(Some((page, next)))
            }
        })
    }

    async fn collect(&self, pattern: SearchPattern) -> StoreResult<SearchResult> {
        self.pages(pattern)
            .try_fold(SearchResult::new(), |mut acc, page| async move {
                acc.extend(page);
                Ok(acc)
            })
            .await
    }
}
