//! Queue transport port (at-least-once delivery).
//!
//! The transport hides its broker behind two calls: a blocking long-poll
//! `receive` and an acknowledge-by-delete. A received message stays
//! invisible to other receivers for the transport's visibility timeout;
//! if it is not deleted within that window it becomes redeliverable.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// One received delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    /// Stable identifier of the underlying message; equal across
    /// redeliveries. Dedup keys derive from this.
    pub message_id: String,
    /// Handle for acknowledging this particular delivery.
    pub receipt: String,
    pub body: Vec<u8>,
}

/// Transport-level failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Worth retrying on the next poll.
    #[error("transient transport failure: {0}")]
    Transient(String),

    /// The transport is gone; polling must stop.
    #[error("fatal transport failure: {0}")]
    Fatal(String),
}

/// Blocking queue consumer interface.
pub trait QueueClient: Send + Sync {
    /// Long-poll for up to `wait`, returning at most `max_messages`
    /// deliveries. An empty vector means the wait elapsed quietly.
    fn receive(
        &self,
        wait: Duration,
        max_messages: usize,
    ) -> Result<Vec<QueueMessage>, TransportError>;

    /// Acknowledge a delivery, removing the message from the queue.
    /// Deleting an already-deleted message is harmless.
    fn delete(&self, receipt: &str) -> Result<(), TransportError>;
}

impl<Q> QueueClient for Arc<Q>
where
    Q: QueueClient + ?Sized,
{
    fn receive(
        &self,
        wait: Duration,
        max_messages: usize,
    ) -> Result<Vec<QueueMessage>, TransportError> {
        (**self).receive(wait, max_messages)
    }

    fn delete(&self, receipt: &str) -> Result<(), TransportError> {
        (**self).delete(receipt)
    }
}
