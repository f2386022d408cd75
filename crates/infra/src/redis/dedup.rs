//! Redis dedup store.

use std::time::Duration;

use mintbank_messaging::{DedupError, DedupStore};

/// Dedup store backed by Redis string keys with TTL.
#[derive(Debug, Clone)]
pub struct RedisDedupStore {
    client: redis::Client,
}

impl RedisDedupStore {
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, DedupError> {
        let client =
            redis::Client::open(redis_url.as_ref()).map_err(|e| DedupError(e.to_string()))?;
        Ok(Self { client })
    }

    fn connection(&self) -> Result<redis::Connection, DedupError> {
        self.client
            .get_connection()
            .map_err(|e| DedupError(e.to_string()))
    }
}

impl DedupStore for RedisDedupStore {
    fn exists(&self, key: &str) -> Result<bool, DedupError> {
        let mut conn = self.connection()?;
        redis::cmd("EXISTS")
            .arg(key)
            .query(&mut conn)
            .map_err(|e| DedupError(e.to_string()))
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DedupError> {
        let mut conn = self.connection()?;
        // A zero expiry would be rejected by Redis; clamp to one second.
        let seconds = ttl.as_secs().max(1);
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(seconds)
            .query(&mut conn)
            .map_err(|e| DedupError(e.to_string()))
    }
}
