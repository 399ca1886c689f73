//! In-process store backend.
//!
//! Keys carry a stable insertion id; scans walk ids in order, so a key that
//! is present for the whole scan is always returned, matching the guarantee
//! of a Redis `SCAN`. The `online` switch simulates losing the connection.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Cursor, KvStore, StoreError, StoreResult};

struct Entry {
    id: u64,
    value: String,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    order: BTreeMap<u64, String>,
    next_id: u64,
}

pub struct MemoryStore {
    inner: RwLock<Inner>,
    online: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            online: AtomicBool::new(true),
        }
    }

    /// Toggle simulated connectivity. While offline every call fails with
    /// [`StoreError::Unavailable`].
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.online.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.check_online()?;
        let inner = self.inner.read().await;
        Ok(inner.entries.get(key).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.check_online()?;
        let mut inner = self.inner.write().await;
        if let Some(entry) = inner.entries.get_mut(key) {
            entry.value = value.to_string();
            return Ok(());
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.order.insert(id, key.to_string());
        inner.entries.insert(
            key.to_string(),
            Entry {
                id,
                value: value.to_string(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.check_online()?;
        let mut inner = self.inner.write().await;
        let removed = inner.entries.remove(key);
        match removed {
            Some(entry) => {
                inner.order.remove(&entry.id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.check_online()?;
        Ok(self.inner.read().await.entries.contains_key(key))
    }

    async fn scan(&self, cursor: Cursor, count: usize) -> StoreResult<(Cursor, Vec<String>)> {
        self.check_online()?;
        let inner = self.inner.read().await;

        let mut page = Vec::new();
        let mut last = None;
        for (id, key) in inner.order.range(cursor.max(1)..).take(count.max(1)) {
            page.push(key.clone());
            last = Some(*id);
        }

        let next = match last {
            Some(id) if inner.order.range(id + 1..).next().is_some() => id + 1,
            _ => 0,
        };
        Ok((next, page))
    }

    async fn get_many(&self, keys: &[String]) -> StoreResult<Vec<(String, Option<String>)>> {
        self.check_online()?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let inner = self.inner.read().await;
        Ok(keys
            .iter()
            .map(|k| (k.clone(), inner.entries.get(k).map(|e| e.value.clone())))
            .collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.check_online()
    }
}
