//! Redis-backed adapters (optional, behind the `redis` cargo feature).
//!
//! - [`RedisDedupStore`]: processed-marker store via `SET key value EX ttl`.
//! - [`RedisStreamQueue`]: durable at-least-once queue over Redis Streams
//!   (XADD/XREADGROUP/XACK) with pending-entry reclaim standing in for a
//!   visibility timeout, and a dead-letter stream for poison messages.
//! - [`RedisPubSubNotifier`]: account-created notifications via PUBLISH.

mod dedup;
mod notify;
mod stream_queue;

pub use dedup::RedisDedupStore;
pub use notify::RedisPubSubNotifier;
pub use stream_queue::RedisStreamQueue;
