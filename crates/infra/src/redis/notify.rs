//! Redis pub/sub notification publisher.
//!
//! Note: pub/sub is not durable (messages are dropped if no subscriber is
//! listening). That matches the fire-and-forget contract of the port.

use redis::Commands;
use tracing::warn;

use mintbank_accounts::{AccountCreatedEvent, AccountCreatedNotifier};

/// Publishes account-created events as JSON on a pub/sub channel.
#[derive(Debug, Clone)]
pub struct RedisPubSubNotifier {
    client: redis::Client,
    channel: String,
}

impl RedisPubSubNotifier {
    pub fn new(
        redis_url: impl AsRef<str>,
        channel: impl Into<String>,
    ) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url.as_ref())?;
        Ok(Self {
            client,
            channel: channel.into(),
        })
    }
}

impl AccountCreatedNotifier for RedisPubSubNotifier {
    fn publish_account_created(&self, event: AccountCreatedEvent) {
        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to serialize account-created event");
                return;
            }
        };

        let result = self
            .client
            .get_connection()
            .and_then(|mut conn| conn.publish::<_, _, i64>(&self.channel, payload));
        if let Err(e) = result {
            warn!(
                user_id = %event.user_id,
                error = %e,
                "failed to publish account-created notification"
            );
        }
    }
}
