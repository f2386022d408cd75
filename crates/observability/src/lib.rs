//! Observability concerns (logging/tracing initialization).

pub mod tracing;

pub use self::tracing::init;
