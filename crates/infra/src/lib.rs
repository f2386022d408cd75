//! Infrastructure layer: notification adapters, Redis-backed dedup/queue,
//! and the wiring that composes the consumer with the ledger engine.

pub mod notify;
pub mod wiring;

#[cfg(feature = "redis")]
pub mod redis;

#[cfg(test)]
mod integration_tests;

pub use notify::{RecordingNotifier, TracingNotifier};
pub use wiring::event_provisioning_handler;
