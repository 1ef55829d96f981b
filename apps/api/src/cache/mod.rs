//! Memoization of assembly runs keyed by input fingerprint.
//!
//! The engine is pure, so a cached document is identical to a fresh run.
//! Values are stored as serialized JSON so both backends share one format.

use std::collections::{HashMap, VecDeque};

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::RwLock;

const KEY_PREFIX: &str = "assembly:";

#[async_trait]
pub trait AssemblyCache: Send + Sync {
    async fn get(&self, fingerprint: &str) -> Result<Option<String>>;
    async fn put(&self, fingerprint: &str, value: String) -> Result<()>;
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory (single process, FIFO eviction)
// ────────────────────────────────────────────────────────────────────────────

pub struct InMemoryCache {
    capacity: usize,
    inner: RwLock<Entries>,
}

#[derive(Default)]
struct Entries {
    values: HashMap<String, String>,
    order: VecDeque<String>,
}

impl InMemoryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: RwLock::new(Entries::default()),
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.read().await.values.len()
    }
}

#[async_trait]
impl AssemblyCache for InMemoryCache {
    async fn get(&self, fingerprint: &str) -> Result<Option<String>> {
        Ok(self.inner.read().await.values.get(fingerprint).cloned())
    }

    async fn put(&self, fingerprint: &str, value: String) -> Result<()> {
        let mut guard = self.inner.write().await;
        let entries = &mut *guard;
        if entries.values.insert(fingerprint.to_string(), value).is_none() {
            entries.order.push_back(fingerprint.to_string());
        }
        while entries.values.len() > self.capacity {
            match entries.order.pop_front() {
                Some(oldest) => {
                    entries.values.remove(&oldest);
                }
                None => break,
            }
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Redis (shared across instances, TTL eviction)
// ────────────────────────────────────────────────────────────────────────────

pub struct RedisCache {
    client: redis::Client,
    ttl_secs: u64,
}

impl RedisCache {
    pub fn new(redis_url: &str, ttl_secs: u64) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .with_context(|| format!("Invalid REDIS_URL '{redis_url}'"))?;
        Ok(Self { client, ttl_secs })
    }
}

#[async_trait]
impl AssemblyCache for RedisCache {
    async fn get(&self, fingerprint: &str) -> Result<Option<String>> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;
        let value: Option<String> = conn
            .get(format!("{KEY_PREFIX}{fingerprint}"))
            .await
            .context("Redis GET failed")?;
        Ok(value)
    }

    async fn put(&self, fingerprint: &str, value: String) -> Result<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")?;
        conn.set_ex::<_, _, ()>(format!("{KEY_PREFIX}{fingerprint}"), value, self.ttl_secs)
            .await
            .context("Redis SET failed")?;
        Ok(())
    }
}
