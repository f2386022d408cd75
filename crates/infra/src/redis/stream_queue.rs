//! Redis Streams-backed queue transport (durable, at-least-once).
//!
//! Stream entries carry the message body under a single `body` field.
//! A consumer group gives at-least-once semantics: entries stay in the
//! group's pending list until XACK'd. Pending entries idle for longer than
//! the visibility timeout are reclaimed (redelivered) on the next receive;
//! entries redelivered more than `max_deliveries` times are moved to a
//! dead-letter stream instead.

use std::collections::HashMap;
use std::time::Duration;

use tracing::warn;

use mintbank_messaging::{QueueClient, QueueMessage, TransportError};

/// Default pending-entry idle time before an entry is reclaimed.
const DEFAULT_VISIBILITY: Duration = Duration::from_secs(60);

/// Default delivery attempts before an entry is dead-lettered.
const DEFAULT_MAX_DELIVERIES: u64 = 5;

/// Stream entry field holding the message body.
const BODY_FIELD: &str = "body";

/// Queue transport over a Redis stream + consumer group.
#[derive(Debug, Clone)]
pub struct RedisStreamQueue {
    client: redis::Client,
    stream_key: String,
    group: String,
    consumer_name: String,
    dlq_key: String,
    visibility: Duration,
    max_deliveries: u64,
}

impl RedisStreamQueue {
    /// Open the transport and ensure the consumer group exists.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    /// * `stream_key` - stream holding account-creation events
    /// * `group` - consumer group name
    /// * `consumer_name` - unique consumer name within the group
    pub fn new(
        redis_url: impl AsRef<str>,
        stream_key: impl Into<String>,
        group: impl Into<String>,
        consumer_name: impl Into<String>,
    ) -> Result<Self, TransportError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| TransportError::Fatal(e.to_string()))?;

        let stream_key = stream_key.into();
        let queue = Self {
            client,
            dlq_key: format!("{stream_key}:dlq"),
            stream_key,
            group: group.into(),
            consumer_name: consumer_name.into(),
            visibility: DEFAULT_VISIBILITY,
            max_deliveries: DEFAULT_MAX_DELIVERIES,
        };
        queue.ensure_group()?;
        Ok(queue)
    }

    pub fn with_visibility_timeout(mut self, visibility: Duration) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_max_deliveries(mut self, max_deliveries: u64) -> Self {
        self.max_deliveries = max_deliveries;
        self
    }

    /// Append a message body to the stream; returns the entry id.
    pub fn send(&self, body: &[u8]) -> Result<String, TransportError> {
        let mut conn = self.connection()?;
        redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("*")
            .arg(BODY_FIELD)
            .arg(body)
            .query(&mut conn)
            .map_err(classify)
    }

    /// Create the consumer group if it does not exist (idempotent).
    fn ensure_group(&self) -> Result<(), TransportError> {
        let mut conn = self.connection()?;
        // BUSYGROUP means the group already exists; ignore it.
        let _: Result<String, _> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.stream_key)
            .arg(&self.group)
            .arg("0")
            .arg("MKSTREAM")
            .query(&mut conn);
        Ok(())
    }

    fn connection(&self) -> Result<redis::Connection, TransportError> {
        self.client.get_connection().map_err(classify)
    }

    /// Reclaim pending entries idle past the visibility timeout, routing
    /// over-delivered entries to the dead-letter stream instead.
    fn reclaim_pending(
        &self,
        conn: &mut redis::Connection,
        max_messages: usize,
    ) -> Result<Vec<QueueMessage>, TransportError> {
        let pending: Vec<(String, String, u64, u64)> = match redis::cmd("XPENDING")
            .arg(&self.stream_key)
            .arg(&self.group)
            .arg("-")
            .arg("+")
            .arg(max_messages)
            .query(conn)
        {
            Ok(entries) => entries,
            Err(_) => return Ok(Vec::new()),
        };
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let mut claim_ids = Vec::new();
        for (id, _consumer, _idle_ms, deliveries) in &pending {
            if *deliveries >= self.max_deliveries {
                self.dead_letter(conn, id, *deliveries);
            } else {
                claim_ids.push(id.clone());
            }
        }
        if claim_ids.is_empty() {
            return Ok(Vec::new());
        }

        // XCLAIM only hands over entries idle for at least the visibility
        // timeout; fresher entries stay with their current consumer.
        let claimed: redis::Value = redis::cmd("XCLAIM")
            .arg(&self.stream_key)
            .arg(&self.group)
            .arg(&self.consumer_name)
            .arg(self.visibility.as_millis() as u64)
            .arg(&claim_ids)
            .query(conn)
            .map_err(classify)?;

        Ok(parse_entries(claimed))
    }

    /// Read new entries for this consumer, blocking up to `wait`.
    fn read_new(
        &self,
        conn: &mut redis::Connection,
        wait: Duration,
        max_messages: usize,
    ) -> Result<Vec<QueueMessage>, TransportError> {
        let reply: redis::Value = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.group)
            .arg(&self.consumer_name)
            .arg("COUNT")
            .arg(max_messages)
            .arg("BLOCK")
            .arg(wait.as_millis() as u64)
            .arg("STREAMS")
            .arg(&self.stream_key)
            .arg(">")
            .query(conn)
            .map_err(classify)?;

        // Nil means the blocking wait elapsed with nothing to read.
        let redis::Value::Bulk(streams) = reply else {
            return Ok(Vec::new());
        };

        let mut messages = Vec::new();
        for stream in streams {
            let redis::Value::Bulk(pair) = stream else {
                continue;
            };
            if let Some(entries) = pair.into_iter().nth(1) {
                messages.extend(parse_entries(entries));
            }
        }
        Ok(messages)
    }

    /// Copy a poison entry to the dead-letter stream and ack it away.
    fn dead_letter(&self, conn: &mut redis::Connection, entry_id: &str, deliveries: u64) {
        let range: redis::Value = match redis::cmd("XRANGE")
            .arg(&self.stream_key)
            .arg(entry_id)
            .arg(entry_id)
            .query(conn)
        {
            Ok(value) => value,
            Err(e) => {
                warn!(entry_id = %entry_id, error = %e, "failed to read entry for dead-lettering");
                return;
            }
        };

        if let Some(message) = parse_entries(range).into_iter().next() {
            let result: Result<String, _> = redis::cmd("XADD")
                .arg(&self.dlq_key)
                .arg("*")
                .arg("original_id")
                .arg(entry_id)
                .arg("deliveries")
                .arg(deliveries)
                .arg(BODY_FIELD)
                .arg(&message.body)
                .query(conn);
            if let Err(e) = result {
                warn!(entry_id = %entry_id, error = %e, "failed to write dead-letter entry");
                return;
            }
        }

        let _: Result<u64, _> = redis::cmd("XACK")
            .arg(&self.stream_key)
            .arg(&self.group)
            .arg(entry_id)
            .query(conn);
        let _: Result<u64, _> = redis::cmd("XDEL")
            .arg(&self.stream_key)
            .arg(entry_id)
            .query(conn);

        warn!(
            entry_id = %entry_id,
            deliveries = deliveries,
            "message moved to dead-letter stream"
        );
    }
}

impl QueueClient for RedisStreamQueue {
    fn receive(
        &self,
        wait: Duration,
        max_messages: usize,
    ) -> Result<Vec<QueueMessage>, TransportError> {
        let mut conn = self.connection()?;

        let reclaimed = self.reclaim_pending(&mut conn, max_messages)?;
        if !reclaimed.is_empty() {
            return Ok(reclaimed);
        }

        self.read_new(&mut conn, wait, max_messages)
    }

    fn delete(&self, receipt: &str) -> Result<(), TransportError> {
        let mut conn = self.connection()?;
        let _: u64 = redis::cmd("XACK")
            .arg(&self.stream_key)
            .arg(&self.group)
            .arg(receipt)
            .query(&mut conn)
            .map_err(classify)?;
        let _: u64 = redis::cmd("XDEL")
            .arg(&self.stream_key)
            .arg(receipt)
            .query(&mut conn)
            .map_err(classify)?;
        Ok(())
    }
}

fn classify(e: redis::RedisError) -> TransportError {
    match e.kind() {
        redis::ErrorKind::AuthenticationFailed | redis::ErrorKind::InvalidClientConfig => {
            TransportError::Fatal(e.to_string())
        }
        _ => TransportError::Transient(e.to_string()),
    }
}

/// Parse an array of stream entries into queue messages.
///
/// Entry format: `[entry_id, [field, value, field, value, ...]]`. Entries
/// that do not parse are skipped. The entry id doubles as message id and
/// receipt: it is stable across redeliveries and is what XACK expects.
fn parse_entries(value: redis::Value) -> Vec<QueueMessage> {
    let redis::Value::Bulk(entries) = value else {
        return Vec::new();
    };

    let mut messages = Vec::new();
    for entry in entries {
        let redis::Value::Bulk(parts) = entry else {
            continue;
        };
        let mut parts = parts.into_iter();
        let Some(redis::Value::Data(id)) = parts.next() else {
            continue;
        };
        let Some(redis::Value::Bulk(fields)) = parts.next() else {
            continue;
        };

        let mut map: HashMap<String, Vec<u8>> = HashMap::new();
        for chunk in fields.chunks(2) {
            if let [redis::Value::Data(key), redis::Value::Data(val)] = chunk {
                map.insert(String::from_utf8_lossy(key).to_string(), val.clone());
            }
        }

        let Some(body) = map.remove(BODY_FIELD) else {
            continue;
        };
        let entry_id = String::from_utf8_lossy(&id).to_string();
        messages.push(QueueMessage {
            message_id: entry_id.clone(),
            receipt: entry_id,
            body,
        });
    }
    messages
}
