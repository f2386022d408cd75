//! Processed-message dedup store port.
//!
//! A key-value store with per-key expiry. Presence of a key means "this
//! message id was already applied"; absence means never seen, or seen so
//! long ago that the marker expired. It is a cache, not a source of truth:
//! expiry bounds memory at the cost of rare duplicate reprocessing, which
//! the ledger absorbs at the business level.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Dedup store failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("dedup store failure: {0}")]
pub struct DedupError(pub String);

/// Key-value store with per-key TTL.
pub trait DedupStore: Send + Sync {
    fn exists(&self, key: &str) -> Result<bool, DedupError>;

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DedupError>;
}

impl<D> DedupStore for Arc<D>
where
    D: DedupStore + ?Sized,
{
    fn exists(&self, key: &str) -> Result<bool, DedupError> {
        (**self).exists(key)
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DedupError> {
        (**self).set(key, value, ttl)
    }
}
