//! Account and transaction model.
//!
//! Amounts are `i64` whole currency units. Transactions reference their
//! owning account by identifier only; the store joins by that identifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mintbank_core::{AccountId, AccountNumber, TransactionId, UserId};

/// Direction of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

impl TransactionKind {
    /// Default ledger description for this kind.
    pub fn description(self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
        }
    }
}

/// A provisioned bank account.
///
/// Invariant: `balance` equals the chronological replay of the account's
/// transactions, clamped at zero, and is never negative at rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub account_number: AccountNumber,
    pub user_id: UserId,
    pub user_name: Option<String>,
    /// Whole currency units; never negative.
    pub balance: i64,
    /// Fixed monthly salary. `None` means salary-random mode: each
    /// synthesized month draws an independent income amount.
    pub salary: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One immutable ledger entry (no update or delete exists).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Owning account, by identifier only.
    pub account_id: AccountId,
    /// Positive amount in whole currency units.
    pub amount: i64,
    pub kind: TransactionKind,
    pub created_at: DateTime<Utc>,
    pub description: String,
    pub memo: Option<String>,
}

impl Transaction {
    /// Build a transaction dated `at` with the kind's default description.
    pub fn new(
        account_id: AccountId,
        kind: TransactionKind,
        amount: i64,
        at: DateTime<Utc>,
        memo: Option<String>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            account_id,
            amount,
            kind,
            created_at: at,
            description: kind.description().to_string(),
            memo,
        }
    }

    /// Signed effect of this transaction on a balance.
    pub fn signed_amount(&self) -> i64 {
        match self.kind {
            TransactionKind::Deposit => self.amount,
            TransactionKind::Withdrawal => -self.amount,
        }
    }
}
