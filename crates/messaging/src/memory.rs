//! In-memory queue and dedup store for tests/dev.
//!
//! The queue mimics an at-least-once broker: received messages become
//! invisible for a visibility timeout and reappear (same message id, fresh
//! receipt) when not deleted in time.

use std::collections::{HashMap, VecDeque};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::dedup::{DedupError, DedupStore};
use crate::queue::{QueueClient, QueueMessage, TransportError};

#[derive(Debug, Clone)]
struct StoredMessage {
    message_id: String,
    body: Vec<u8>,
}

#[derive(Debug)]
struct InFlight {
    message: StoredMessage,
    redeliver_at: Instant,
}

#[derive(Debug, Default)]
struct QueueInner {
    visible: VecDeque<StoredMessage>,
    in_flight: HashMap<String, InFlight>,
    closed: bool,
}

/// In-memory at-least-once queue.
#[derive(Debug)]
pub struct InMemoryQueue {
    inner: Mutex<QueueInner>,
    arrived: Condvar,
    visibility: Duration,
}

/// Granularity of the blocking wait inside `receive`, so expired in-flight
/// messages are requeued promptly even while a long poll is parked.
const WAIT_SLICE: Duration = Duration::from_millis(25);

impl InMemoryQueue {
    /// Queue with a 30s visibility timeout.
    pub fn new() -> Self {
        Self::with_visibility_timeout(Duration::from_secs(30))
    }

    /// Queue with an explicit visibility timeout. `Duration::ZERO` makes
    /// unacknowledged messages redeliverable immediately, which is handy
    /// in redelivery tests.
    pub fn with_visibility_timeout(visibility: Duration) -> Self {
        Self {
            inner: Mutex::new(QueueInner::default()),
            arrived: Condvar::new(),
            visibility,
        }
    }

    /// Enqueue a message body; returns the assigned message id.
    pub fn send(&self, body: impl Into<Vec<u8>>) -> String {
        let message_id = Uuid::now_v7().to_string();
        let mut inner = self.inner.lock().unwrap();
        inner.visible.push_back(StoredMessage {
            message_id: message_id.clone(),
            body: body.into(),
        });
        self.arrived.notify_all();
        message_id
    }

    /// Stop the transport: subsequent receives fail fatally.
    pub fn close(&self) {
        self.inner.lock().unwrap().closed = true;
        self.arrived.notify_all();
    }

    /// Messages currently visible (not in flight).
    pub fn visible_len(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        Self::requeue_expired(&mut inner);
        inner.visible.len()
    }

    /// Messages delivered but not yet acknowledged.
    pub fn in_flight_len(&self) -> usize {
        self.inner.lock().unwrap().in_flight.len()
    }

    fn requeue_expired(inner: &mut QueueInner) {
        let now = Instant::now();
        let expired: Vec<String> = inner
            .in_flight
            .iter()
            .filter(|(_, f)| f.redeliver_at <= now)
            .map(|(receipt, _)| receipt.clone())
            .collect();
        for receipt in expired {
            if let Some(flight) = inner.in_flight.remove(&receipt) {
                inner.visible.push_back(flight.message);
            }
        }
    }

    fn take_batch(&self, inner: &mut QueueInner, max_messages: usize) -> Vec<QueueMessage> {
        let mut batch = Vec::new();
        while batch.len() < max_messages {
            let Some(stored) = inner.visible.pop_front() else {
                break;
            };
            let receipt = Uuid::now_v7().to_string();
            batch.push(QueueMessage {
                message_id: stored.message_id.clone(),
                receipt: receipt.clone(),
                body: stored.body.clone(),
            });
            inner.in_flight.insert(
                receipt,
                InFlight {
                    message: stored,
                    redeliver_at: Instant::now() + self.visibility,
                },
            );
        }
        batch
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueClient for InMemoryQueue {
    fn receive(
        &self,
        wait: Duration,
        max_messages: usize,
    ) -> Result<Vec<QueueMessage>, TransportError> {
        let deadline = Instant::now() + wait;
        let mut inner = self.inner.lock().unwrap();

        loop {
            if inner.closed {
                return Err(TransportError::Fatal("queue closed".to_string()));
            }

            Self::requeue_expired(&mut inner);
            if !inner.visible.is_empty() {
                return Ok(self.take_batch(&mut inner, max_messages));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            let slice = WAIT_SLICE.min(deadline - now);
            let (guard, _timeout) = self
                .arrived
                .wait_timeout(inner, slice)
                .map_err(|_| TransportError::Fatal("queue lock poisoned".to_string()))?;
            inner = guard;
        }
    }

    fn delete(&self, receipt: &str) -> Result<(), TransportError> {
        // Unknown receipts are tolerated: duplicate deletes are harmless.
        self.inner.lock().unwrap().in_flight.remove(receipt);
        Ok(())
    }
}

/// In-memory dedup store with per-key expiry.
#[derive(Debug, Default)]
pub struct InMemoryDedupStore {
    entries: Mutex<HashMap<String, Instant>>,
}

impl InMemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, expires_at| *expires_at > now);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DedupStore for InMemoryDedupStore {
    fn exists(&self, key: &str) -> Result<bool, DedupError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| DedupError("dedup lock poisoned".to_string()))?;
        match entries.get(key) {
            Some(expires_at) if *expires_at > Instant::now() => Ok(true),
            Some(_) => {
                entries.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    fn set(&self, key: &str, _value: &str, ttl: Duration) -> Result<(), DedupError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| DedupError("dedup lock poisoned".to_string()))?;
        entries.insert(key.to_string(), Instant::now() + ttl);
        Ok(())
    }
}
