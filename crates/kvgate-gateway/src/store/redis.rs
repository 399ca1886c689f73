//! Redis store backend.
//!
//! Uses the async `ConnectionManager` (multiplexed, reconnects on its own).
//! The manager is created on first use rather than at startup, so the gateway
//! comes up and reports `DOWN` while Redis is unreachable instead of refusing
//! to start.
//!
//! Connecting runs in one background task. Calls that arrive while it is in
//! flight wait on its outcome together through a `watch` channel, so an
//! unreachable server costs every caller one connect attempt at most, not one
//! attempt per queued caller. A failed attempt is retried by the next call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client, RedisError};
use tokio::sync::watch;

use super::{Cursor, KvStore, StoreError, StoreResult};

enum Link {
    Idle,
    Connecting,
    Ready(ConnectionManager),
    Failed(String),
}

pub struct RedisStore {
    client: Client,
    config: ConnectionManagerConfig,
    link: Arc<watch::Sender<Link>>,
    addr: String,
}

impl RedisStore {
    pub fn new(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        response_timeout: Duration,
    ) -> StoreResult<Self> {
        let addr = format!("{host}:{port}");
        let client = Client::open(format!("redis://{addr}/")).map_err(classify)?;
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(connect_timeout)
            .set_response_timeout(response_timeout);
        let (link, _) = watch::channel(Link::Idle);
        Ok(Self {
            client,
            config,
            link: Arc::new(link),
            addr,
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn conn(&self) -> StoreResult<ConnectionManager> {
        let mut rx = self.link.subscribe();
        let start = self.link.send_if_modified(|link| match link {
            Link::Idle | Link::Failed(_) => {
                *link = Link::Connecting;
                true
            }
            Link::Connecting | Link::Ready(_) => false,
        });
        if start {
            self.spawn_connect();
        }

        let link = rx
            .wait_for(|link| !matches!(link, Link::Connecting))
            .await
            .map_err(|_| StoreError::Unavailable("redis connect task gone".into()))?;
        match &*link {
            Link::Ready(manager) => Ok(manager.clone()),
            Link::Failed(reason) => Err(StoreError::Unavailable(reason.clone())),
            Link::Idle | Link::Connecting => {
                Err(StoreError::Unavailable("redis not connected".into()))
            }
        }
    }

    fn spawn_connect(&self) {
        let client = self.client.clone();
        let config = self.config.clone();
        let link = Arc::clone(&self.link);
        let addr = self.addr.clone();
        tokio::spawn(async move {
            let next = match ConnectionManager::new_with_config(client, config).await {
                Ok(manager) => {
                    tracing::info!(%addr, "redis connection established");
                    Link::Ready(manager)
                }
                Err(e) => {
                    tracing::debug!(%addr, error = %e, "redis connect failed");
                    Link::Failed(e.to_string())
                }
            };
            link.send_replace(next);
        });
    }
}

/// Split connectivity failures from errors the server actually returned.
fn classify(e: RedisError) -> StoreError {
    if e.is_connection_refusal() || e.is_connection_dropped() || e.is_io_error() || e.is_timeout() {
        StoreError::Unavailable(e.to_string())
    } else {
        StoreError::Backend(e.to_string())
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn().await?;
        conn.get::<_, Option<String>>(key).await.map_err(classify)
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        conn.set::<_, _, ()>(key, value).await.map_err(classify)
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let removed: i64 = conn.del(key).await.map_err(classify)?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        conn.exists::<_, bool>(key).await.map_err(classify)
    }

    async fn scan(&self, cursor: Cursor, count: usize) -> StoreResult<(Cursor, Vec<String>)> {
        let mut conn = self.conn().await?;
        redis::cmd("SCAN")
            .arg(cursor)
            .arg("COUNT")
            .arg(count.max(1))
            .query_async::<(Cursor, Vec<String>)>(&mut conn)
            .await
            .map_err(classify)
    }

    async fn get_many(&self, keys: &[String]) -> StoreResult<Vec<(String, Option<String>)>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .map_err(classify)?;
        if values.len() != keys.len() {
            return Err(StoreError::Backend(format!(
                "MGET returned {} values for {} keys",
                values.len(),
                keys.len()
            )));
        }
        Ok(keys.iter().cloned().zip(values).collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    // Non-routable address: connects hang until the connect timeout fires.
    fn unreachable() -> RedisStore {
        RedisStore::new(
            "10.255.255.1",
            6379,
            Duration::from_millis(300),
            Duration::from_millis(300),
        )
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_calls_share_one_connect_attempt() {
        let store = Arc::new(unreachable());

        let single = Instant::now();
        assert!(store.ping().await.is_err());
        let one_attempt = single.elapsed();

        let started = Instant::now();
        let calls: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.ping().await })
            })
            .collect();
        for call in calls {
            assert!(call.await.unwrap().is_err());
        }
        let all = started.elapsed();

        // Serialized attempts would take roughly eight times one attempt.
        assert!(
            all < one_attempt * 3 + Duration::from_millis(500),
            "8 calls took {all:?}, one attempt took {one_attempt:?}"
        );
    }

    #[tokio::test]
    async fn failed_attempt_is_retried_by_next_call() {
        let store = unreachable();
        assert!(store.get("k").await.is_err());
        assert!(matches!(*store.link.borrow(), Link::Failed(_)));
        assert!(store.get("k").await.is_err());
    }
}
