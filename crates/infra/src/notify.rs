//! Notification adapters.
//!
//! All of these are fire-and-forget: failures are logged, never surfaced.

use std::sync::Mutex;

use tracing::info;

use mintbank_accounts::{AccountCreatedEvent, AccountCreatedNotifier};

/// Notifier that emits a structured log line per created account.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl AccountCreatedNotifier for TracingNotifier {
    fn publish_account_created(&self, event: AccountCreatedEvent) {
        info!(
            user_id = %event.user_id,
            user_name = event.user_name.as_deref().unwrap_or(""),
            created_at = %event.created_at,
            "account created"
        );
    }
}

/// Notifier that records every event, for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<AccountCreatedEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AccountCreatedEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl AccountCreatedNotifier for RecordingNotifier {
    fn publish_account_created(&self, event: AccountCreatedEvent) {
        self.events.lock().unwrap().push(event);
    }
}
