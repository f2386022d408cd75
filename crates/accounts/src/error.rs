//! Ledger error model.
//!
//! Deterministic domain failures are explicit variants; storage faults are
//! carried through from the store layer.

use thiserror::Error;

use crate::store::LedgerStoreError;

/// Errors surfaced by ledger engine operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// No account exists for the requested user.
    #[error("account not found")]
    AccountNotFound,

    /// A withdrawal exceeds the current balance. No state is changed.
    #[error("insufficient balance")]
    InsufficientBalance,

    /// A statistics range where the start month is after the end month.
    #[error("invalid statement range: {0}")]
    InvalidRange(String),

    /// Account number generation kept colliding with existing numbers.
    #[error("account number generation exhausted after {attempts} attempts")]
    AccountNumberExhausted { attempts: u32 },

    /// The ledger store failed.
    #[error(transparent)]
    Store(#[from] LedgerStoreError),
}
