//! Idempotent provisioning consumer.
//!
//! A single worker thread long-polls the queue and, per message:
//!
//! ```text
//! RECEIVED → dedup check → duplicate? skip (delete only if configured)
//!                        → novel:    decode → handle
//!            success → dedup mark → delete        (mark-then-delete)
//!            failure → leave for redelivery       (no mark, no delete)
//! ```
//!
//! Mark-then-delete ordering means a crash between the two costs at worst
//! a duplicate delete attempt, never a reprocess. Decode and handler
//! errors fail that message only; the batch and the loop continue. A fatal
//! transport error terminates the loop.

use std::fmt::Display;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::decode::{self, ProvisioningRequest};
use crate::dedup::DedupStore;
use crate::queue::{QueueClient, QueueMessage, TransportError};

/// Value stored under a dedup key.
const PROCESSED_MARKER: &str = "processed";

/// What to do with the queue copy of an already-processed message.
///
/// The safe default leaves it alone: the delivery that set the mark owns
/// the delete, and a premature delete on a half-processed original would
/// lose data. Deleting drains duplicates faster at the cost of trusting
/// the mark alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateAction {
    #[default]
    Leave,
    Delete,
}

/// Consumer tuning knobs.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Name for the worker thread and log fields.
    pub name: String,
    /// Long-poll duration per receive call.
    pub queue_wait: Duration,
    /// Upper bound on messages per receive.
    pub batch_size: usize,
    /// Prefix prepended to message ids to form dedup keys.
    pub dedup_key_prefix: String,
    /// How long a processed-marker lives.
    pub dedup_ttl: Duration,
    pub on_duplicate: DuplicateAction,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            name: "provisioning-consumer".to_string(),
            queue_wait: Duration::from_secs(20),
            batch_size: 5,
            dedup_key_prefix: "account-event:".to_string(),
            dedup_ttl: Duration::from_secs(60 * 60),
            on_duplicate: DuplicateAction::Leave,
        }
    }
}

impl ConsumerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_queue_wait(mut self, wait: Duration) -> Self {
        self.queue_wait = wait;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_dedup_ttl(mut self, ttl: Duration) -> Self {
        self.dedup_ttl = ttl;
        self
    }

    pub fn with_duplicate_action(mut self, action: DuplicateAction) -> Self {
        self.on_duplicate = action;
        self
    }
}

/// Handle to control and join a running consumer.
#[derive(Debug)]
pub struct ConsumerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl ConsumerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    ///
    /// The worker finishes its in-flight receive/process cycle first, so
    /// control returns within roughly one poll interval. Unacknowledged
    /// messages stay redeliverable.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Outcome of one message, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Provisioned,
    Duplicate,
    Failed,
}

/// Queue consumer that provisions accounts exactly once in effect.
///
/// Generic over the queue transport, the dedup store, and the
/// provisioning handler (typically a closure over the ledger engine).
pub struct ProvisioningConsumer<Q, D, H> {
    queue: Q,
    dedup: D,
    handler: H,
    config: ConsumerConfig,
}

impl<Q, D, H, E> ProvisioningConsumer<Q, D, H>
where
    Q: QueueClient,
    D: DedupStore,
    H: Fn(ProvisioningRequest) -> Result<(), E>,
    E: Display,
{
    pub fn new(queue: Q, dedup: D, handler: H) -> Self {
        Self::with_config(queue, dedup, handler, ConsumerConfig::default())
    }

    pub fn with_config(queue: Q, dedup: D, handler: H, config: ConsumerConfig) -> Self {
        Self {
            queue,
            dedup,
            handler,
            config,
        }
    }

    /// One receive/process cycle, for tests or synchronous callers.
    ///
    /// Returns how many messages the batch contained. A fatal transport
    /// error propagates; everything else is handled per message.
    pub fn poll_once(&self) -> Result<usize, TransportError> {
        let batch = self
            .queue
            .receive(self.config.queue_wait, self.config.batch_size)?;
        let received = batch.len();
        for message in &batch {
            self.process_message(message);
        }
        Ok(received)
    }

    fn process_message(&self, message: &QueueMessage) -> Outcome {
        let dedup_key = format!("{}{}", self.config.dedup_key_prefix, message.message_id);

        match self.dedup.exists(&dedup_key) {
            Ok(true) => {
                info!(
                    consumer = %self.config.name,
                    message_id = %message.message_id,
                    "duplicate message, skipping"
                );
                if self.config.on_duplicate == DuplicateAction::Delete {
                    if let Err(e) = self.queue.delete(&message.receipt) {
                        warn!(
                            consumer = %self.config.name,
                            message_id = %message.message_id,
                            error = %e,
                            "failed to delete duplicate message"
                        );
                    }
                }
                return Outcome::Duplicate;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(
                    consumer = %self.config.name,
                    message_id = %message.message_id,
                    error = %e,
                    "dedup lookup failed, leaving message for redelivery"
                );
                return Outcome::Failed;
            }
        }

        let request = match decode::decode(&message.body) {
            Ok(request) => request,
            Err(e) => {
                error!(
                    consumer = %self.config.name,
                    message_id = %message.message_id,
                    error = %e,
                    "event decode failed, leaving message for redelivery"
                );
                return Outcome::Failed;
            }
        };

        let user_id = request.user_id;
        if let Err(e) = (self.handler)(request) {
            error!(
                consumer = %self.config.name,
                message_id = %message.message_id,
                user_id = %user_id,
                error = %e,
                "provisioning failed, leaving message for redelivery"
            );
            return Outcome::Failed;
        }

        // Mark strictly after ledger success, delete strictly after mark.
        if let Err(e) = self
            .dedup
            .set(&dedup_key, PROCESSED_MARKER, self.config.dedup_ttl)
        {
            warn!(
                consumer = %self.config.name,
                message_id = %message.message_id,
                error = %e,
                "dedup mark failed, leaving message for redelivery"
            );
            return Outcome::Failed;
        }
        if let Err(e) = self.queue.delete(&message.receipt) {
            warn!(
                consumer = %self.config.name,
                message_id = %message.message_id,
                error = %e,
                "acknowledge failed; the dedup mark will absorb the redelivery"
            );
        }

        debug!(
            consumer = %self.config.name,
            message_id = %message.message_id,
            user_id = %user_id,
            "message processed"
        );
        Outcome::Provisioned
    }
}

impl<Q, D, H, E> ProvisioningConsumer<Q, D, H>
where
    Q: QueueClient + Send + 'static,
    D: DedupStore + Send + 'static,
    H: Fn(ProvisioningRequest) -> Result<(), E> + Send + 'static,
    E: Display,
{
    /// Spawn the consumer on its own worker thread.
    pub fn spawn(self) -> ConsumerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let name = self.config.name.clone();
        let join = thread::Builder::new()
            .name(name)
            .spawn(move || self.run(&shutdown_rx))
            .expect("failed to spawn provisioning consumer thread");

        ConsumerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        }
    }

    fn run(&self, shutdown_rx: &mpsc::Receiver<()>) {
        info!(consumer = %self.config.name, "provisioning consumer started");

        loop {
            // Shutdown check (non-blocking); the receive call below is the
            // only suspension point.
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            match self.poll_once() {
                Ok(_) => {}
                Err(TransportError::Fatal(reason)) => {
                    error!(
                        consumer = %self.config.name,
                        reason = %reason,
                        "fatal transport error, stopping consumer"
                    );
                    break;
                }
                Err(TransportError::Transient(reason)) => {
                    warn!(
                        consumer = %self.config.name,
                        reason = %reason,
                        "transient transport error, will poll again"
                    );
                }
            }
        }

        info!(consumer = %self.config.name, "provisioning consumer stopped");
    }
}
