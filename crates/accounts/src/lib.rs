//! `mintbank-accounts` — the ledger engine.
//!
//! Account provisioning (with synthesized transaction history), deposits,
//! withdrawals, transaction queries and monthly statistics. Owns the
//! non-negative balance invariant. Persistence and notification are ports
//! (`LedgerStore`, `AccountCreatedNotifier`) implemented elsewhere.

pub mod engine;
pub mod error;
pub mod memory;
pub mod model;
pub mod notify;
pub mod stats;
pub mod store;
pub mod synthesis;

pub use engine::{LedgerEngine, NewAccount};
pub use error::LedgerError;
pub use memory::InMemoryLedgerStore;
pub use model::{Account, Transaction, TransactionKind};
pub use notify::{AccountCreatedEvent, AccountCreatedNotifier, NoopNotifier};
pub use stats::{StatementMonth, TransactionStats};
pub use store::{LedgerStore, LedgerStoreError};
