//! Ledger persistence port.
//!
//! The engine never talks to a database directly; it goes through this
//! trait. Implementations must uphold two guarantees:
//!
//! - **Uniqueness**: `user_id` and `account_number` identify at most one
//!   account each; violations are reported as [`LedgerStoreError::Conflict`].
//!   When consumers scale horizontally, this constraint (together with the
//!   dedup store) is what keeps duplicate effects out of the ledger.
//! - **Atomicity**: `create_account` and `append_transaction` are
//!   all-or-nothing. An observer never sees an account without its history,
//!   nor an updated balance without the transaction that caused it.

use std::sync::Arc;

use thiserror::Error;

use mintbank_core::{AccountId, UserId};

use crate::model::{Account, Transaction};

/// Ledger store operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerStoreError {
    /// A uniqueness constraint (`user_id`, `account_number`) was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The underlying storage failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Persistence contract for accounts and their transactions.
pub trait LedgerStore: Send + Sync {
    /// Persist a new account together with its full transaction history.
    /// All-or-nothing; enforces `user_id` and `account_number` uniqueness.
    fn create_account(
        &self,
        account: &Account,
        history: &[Transaction],
    ) -> Result<(), LedgerStoreError>;

    /// Persist an updated account balance together with the transaction
    /// that caused it, as a single atomic unit.
    fn append_transaction(
        &self,
        account: &Account,
        tx: &Transaction,
    ) -> Result<(), LedgerStoreError>;

    fn find_by_user_id(&self, user_id: UserId) -> Result<Option<Account>, LedgerStoreError>;

    fn find_by_account_number(&self, number: &str) -> Result<Option<Account>, LedgerStoreError>;

    fn exists_by_account_number(&self, number: &str) -> Result<bool, LedgerStoreError>;

    /// All transactions for an account, in insertion order.
    fn transactions_for(&self, account_id: AccountId)
        -> Result<Vec<Transaction>, LedgerStoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn create_account(
        &self,
        account: &Account,
        history: &[Transaction],
    ) -> Result<(), LedgerStoreError> {
        (**self).create_account(account, history)
    }

    fn append_transaction(
        &self,
        account: &Account,
        tx: &Transaction,
    ) -> Result<(), LedgerStoreError> {
        (**self).append_transaction(account, tx)
    }

    fn find_by_user_id(&self, user_id: UserId) -> Result<Option<Account>, LedgerStoreError> {
        (**self).find_by_user_id(user_id)
    }

    fn find_by_account_number(&self, number: &str) -> Result<Option<Account>, LedgerStoreError> {
        (**self).find_by_account_number(number)
    }

    fn exists_by_account_number(&self, number: &str) -> Result<bool, LedgerStoreError> {
        (**self).exists_by_account_number(number)
    }

    fn transactions_for(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, LedgerStoreError> {
        (**self).transactions_for(account_id)
    }
}
