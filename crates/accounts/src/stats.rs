//! Monthly transaction statistics.

use core::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Transaction, TransactionKind};

/// A calendar month (`YYYY-MM`), ordered chronologically.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatementMonth {
    year: i32,
    month: u32,
}

/// Parse failure for a `YYYY-MM` month literal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid statement month: {0}")]
pub struct InvalidStatementMonth(String);

impl StatementMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, InvalidStatementMonth> {
        if !(1..=12).contains(&month) {
            return Err(InvalidStatementMonth(format!("month {month} out of range")));
        }
        Ok(Self { year, month })
    }

    pub fn of(timestamp: DateTime<Utc>) -> Self {
        Self {
            year: timestamp.year(),
            month: timestamp.month(),
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    /// Number of months in the inclusive range `self..=end`.
    /// Zero when `self > end`.
    pub fn months_until(self, end: Self) -> i64 {
        let span = (i64::from(end.year) - i64::from(self.year)) * 12
            + (i64::from(end.month) - i64::from(self.month))
            + 1;
        span.max(0)
    }
}

impl core::fmt::Display for StatementMonth {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for StatementMonth {
    type Err = InvalidStatementMonth;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| InvalidStatementMonth(s.to_string()))?;
        let year: i32 = year
            .parse()
            .map_err(|_| InvalidStatementMonth(s.to_string()))?;
        let month: u32 = month
            .parse()
            .map_err(|_| InvalidStatementMonth(s.to_string()))?;
        Self::new(year, month).map_err(|_| InvalidStatementMonth(s.to_string()))
    }
}

/// Income/expense aggregation over an inclusive month range.
///
/// Averages divide by the month count with truncating integer division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStats {
    pub total_income: i64,
    pub total_expense: i64,
    pub avg_monthly_income: i64,
    pub avg_monthly_expense: i64,
}

/// Aggregate the transactions whose calendar month falls in `start..=end`.
///
/// The caller guarantees `start <= end`.
pub fn compute(txs: &[Transaction], start: StatementMonth, end: StatementMonth) -> TransactionStats {
    let months = start.months_until(end);

    let mut total_income = 0i64;
    let mut total_expense = 0i64;
    for tx in txs {
        let month = StatementMonth::of(tx.created_at);
        if month < start || month > end {
            continue;
        }
        match tx.kind {
            TransactionKind::Deposit => total_income += tx.amount,
            TransactionKind::Withdrawal => total_expense += tx.amount,
        }
    }

    let (avg_monthly_income, avg_monthly_expense) = if months > 0 {
        (total_income / months, total_expense / months)
    } else {
        (0, 0)
    };

    TransactionStats {
        total_income,
        total_expense,
        avg_monthly_income,
        avg_monthly_expense,
    }
}
