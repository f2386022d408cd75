//! Outbound notification port.
//!
//! Provisioning publishes a fire-and-forget "account created" notification.
//! The engine never waits on it and never fails because of it, so the port
//! returns `()` and implementations swallow-and-log their own failures.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mintbank_core::UserId;

/// Payload published after a successful account creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCreatedEvent {
    pub user_id: UserId,
    pub user_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fire-and-forget publisher for account-creation notifications.
pub trait AccountCreatedNotifier: Send + Sync {
    fn publish_account_created(&self, event: AccountCreatedEvent);
}

impl<N> AccountCreatedNotifier for Arc<N>
where
    N: AccountCreatedNotifier + ?Sized,
{
    fn publish_account_created(&self, event: AccountCreatedEvent) {
        (**self).publish_account_created(event);
    }
}

/// Notifier that drops every notification. For tests and wiring defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl AccountCreatedNotifier for NoopNotifier {
    fn publish_account_created(&self, _event: AccountCreatedEvent) {}
}
