//! Synthetic transaction history generation.
//!
//! New accounts are provisioned with a plausible past: a random horizon of
//! months is filled with dated deposits/withdrawals plus one salary (or
//! random income) deposit near each month's end. The running balance never
//! goes negative: a withdrawal that would overdraw is skipped, not recorded.
//!
//! All randomness comes from the caller-supplied seedable RNG, so a seed
//! reproduces the same history.

use chrono::{DateTime, Datelike, Months, NaiveDate, Timelike, Utc};
use rand::Rng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use mintbank_core::AccountId;

use crate::model::{Transaction, TransactionKind};

/// Smallest number of past months to synthesize, current month included.
pub const MIN_HORIZON_MONTHS: u32 = 10;
/// Largest number of past months to synthesize, current month included.
pub const MAX_HORIZON_MONTHS: u32 = 36;

const MIN_MONTHLY_TX_COUNT: usize = 10;
const MAX_MONTHLY_TX_COUNT: usize = 20;

/// Random transaction amounts are drawn from `0..=MAX_RANDOM_AMOUNT`;
/// a zero draw is bumped to `MIN_NONZERO_AMOUNT`.
const MAX_RANDOM_AMOUNT: i64 = 700_000;
const MIN_NONZERO_AMOUNT: i64 = 1_000;

/// Salary-random mode draws `200..=500` units of `SALARY_UNIT` per month.
const MIN_RANDOM_SALARY_UNITS: i64 = 200;
const MAX_RANDOM_SALARY_UNITS: i64 = 500;
const SALARY_UNIT: i64 = 10_000;

/// Transactions land between 08:00 and 17:00.
const FIRST_ACTIVE_HOUR: u32 = 8;
const LAST_ACTIVE_HOUR: u32 = 17;

const SALARY_MEMO: &str = "salary";
const INCOME_MEMO: &str = "income";

/// Generate a full synthetic history for a new account.
///
/// `salary: None` selects salary-random mode: each month draws a fresh
/// income amount and labels it `income` instead of `salary`. The returned
/// transactions are sorted chronologically.
pub fn synthesize_history(
    rng: &mut ChaCha8Rng,
    account_id: AccountId,
    salary: Option<i64>,
    now: DateTime<Utc>,
) -> Vec<Transaction> {
    let today = now.day();
    let horizon = rng.random_range(MIN_HORIZON_MONTHS..=MAX_HORIZON_MONTHS);

    let mut history = Vec::new();
    let mut running = 0i64;

    // Oldest month first so `running` tracks chronological order.
    for offset in (0..horizon).rev() {
        let Some(anchor) = now.checked_sub_months(Months::new(offset)) else {
            continue;
        };
        let last_day = days_in_month(anchor.year(), anchor.month());
        let is_current = offset == 0;

        let tx_count = if is_current {
            // Partial month: roughly one transaction every other day so far.
            usize::max(1, today as usize / 2)
        } else {
            rng.random_range(MIN_MONTHLY_TX_COUNT..=MAX_MONTHLY_TX_COUNT)
        };

        // Distinct days, month-end reserved for the income deposit.
        let mut days: Vec<u32> = (1..last_day).collect();
        days.shuffle(rng);
        days.truncate(tx_count.min(days.len()));
        days.sort_unstable();

        for day in days {
            if is_current && day >= today {
                continue;
            }
            let hour = rng.random_range(FIRST_ACTIVE_HOUR..=LAST_ACTIVE_HOUR);
            let Some(at) = date_at(anchor, day, hour) else {
                continue;
            };

            let kind = if rng.random_bool(0.5) {
                TransactionKind::Deposit
            } else {
                TransactionKind::Withdrawal
            };
            let mut amount = rng.random_range(0..=MAX_RANDOM_AMOUNT);
            if amount == 0 {
                amount = MIN_NONZERO_AMOUNT;
            }
            // Balance-invariant enforcement at generation time.
            if kind == TransactionKind::Withdrawal && running < amount {
                continue;
            }

            history.push(Transaction::new(
                account_id,
                kind,
                amount,
                at,
                Some(kind.description().to_string()),
            ));
            running += match kind {
                TransactionKind::Deposit => amount,
                TransactionKind::Withdrawal => -amount,
            };
        }

        // One salary/income deposit at month end, unless that date is
        // still in the future.
        if !(is_current && last_day > today) {
            let hour = rng.random_range(FIRST_ACTIVE_HOUR..=LAST_ACTIVE_HOUR);
            let Some(at) = date_at(anchor, last_day, hour) else {
                continue;
            };
            let (amount, memo) = match salary {
                Some(fixed) => (fixed, SALARY_MEMO),
                None => (
                    rng.random_range(MIN_RANDOM_SALARY_UNITS..=MAX_RANDOM_SALARY_UNITS)
                        * SALARY_UNIT,
                    INCOME_MEMO,
                ),
            };
            history.push(Transaction::new(
                account_id,
                TransactionKind::Deposit,
                amount,
                at,
                Some(memo.to_string()),
            ));
            running += amount;
        }
    }

    history.sort_by_key(|tx| tx.created_at);
    history
}

/// Replay transactions in chronological order, clamping at zero.
///
/// The replayed value, not any generation-time running total, is what gets
/// persisted as the account's resting balance.
pub fn replay_balance(history: &[Transaction]) -> i64 {
    let mut ordered: Vec<&Transaction> = history.iter().collect();
    ordered.sort_by_key(|tx| tx.created_at);

    let mut balance = 0i64;
    for tx in ordered {
        balance += tx.signed_amount();
        if balance < 0 {
            balance = 0;
        }
    }
    balance
}

fn days_in_month(year: i32, month: u32) -> u32 {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

fn date_at(anchor: DateTime<Utc>, day: u32, hour: u32) -> Option<DateTime<Utc>> {
    anchor.with_day(day).and_then(|d| d.with_hour(hour))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;
    use rand::SeedableRng;

    use super::*;
    use crate::stats::StatementMonth;

    fn synthesize(seed: u64, salary: Option<i64>) -> Vec<Transaction> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        synthesize_history(&mut rng, AccountId::new(), salary, Utc::now())
    }

    #[test]
    fn history_is_chronological() {
        let history = synthesize(1, None);
        for pair in history.windows(2) {
            assert!(pair[0].created_at <= pair[1].created_at);
        }
    }

    #[test]
    fn history_spans_at_least_the_minimum_horizon() {
        let history = synthesize(2, None);
        let months: std::collections::HashSet<StatementMonth> = history
            .iter()
            .map(|tx| StatementMonth::of(tx.created_at))
            .collect();
        // The current (partial) month may be empty; every completed month
        // carries at least its income deposit.
        assert!(months.len() as u32 >= MIN_HORIZON_MONTHS - 1);
        assert!(history.len() >= 30);
    }

    #[test]
    fn every_completed_month_has_exactly_one_income_deposit() {
        let history = synthesize(3, None);
        let current = StatementMonth::of(Utc::now());

        let mut income_per_month: HashMap<StatementMonth, usize> = HashMap::new();
        for tx in &history {
            if tx.memo.as_deref() == Some(INCOME_MEMO) {
                *income_per_month
                    .entry(StatementMonth::of(tx.created_at))
                    .or_default() += 1;
            }
        }

        for tx in &history {
            let month = StatementMonth::of(tx.created_at);
            if month < current {
                assert_eq!(
                    income_per_month.get(&month).copied(),
                    Some(1),
                    "month {month} should carry exactly one income deposit"
                );
            }
        }
    }

    #[test]
    fn fixed_salary_uses_the_salary_memo_and_amount() {
        let history = synthesize(4, Some(3_200_000));
        let salaries: Vec<&Transaction> = history
            .iter()
            .filter(|tx| tx.memo.as_deref() == Some(SALARY_MEMO))
            .collect();
        assert!(!salaries.is_empty());
        for tx in salaries {
            assert_eq!(tx.kind, TransactionKind::Deposit);
            assert_eq!(tx.amount, 3_200_000);
        }
        assert!(!history.iter().any(|tx| tx.memo.as_deref() == Some(INCOME_MEMO)));
    }

    #[test]
    fn random_income_stays_in_range() {
        let history = synthesize(5, None);
        for tx in history.iter().filter(|tx| tx.memo.as_deref() == Some(INCOME_MEMO)) {
            assert!(tx.amount >= MIN_RANDOM_SALARY_UNITS * SALARY_UNIT);
            assert!(tx.amount <= MAX_RANDOM_SALARY_UNITS * SALARY_UNIT);
            assert_eq!(tx.amount % SALARY_UNIT, 0);
        }
    }

    #[test]
    fn same_seed_reproduces_the_same_history() {
        let now = Utc::now();
        let account_id = AccountId::new();
        let mut a_rng = ChaCha8Rng::seed_from_u64(42);
        let mut b_rng = ChaCha8Rng::seed_from_u64(42);

        let a = synthesize_history(&mut a_rng, account_id, None, now);
        let b = synthesize_history(&mut b_rng, account_id, None, now);

        let shape = |txs: &[Transaction]| -> Vec<(TransactionKind, i64, DateTime<Utc>)> {
            txs.iter().map(|tx| (tx.kind, tx.amount, tx.created_at)).collect()
        };
        assert_eq!(shape(&a), shape(&b));
    }

    #[test]
    fn replay_clamps_at_zero() {
        let id = AccountId::new();
        let base = Utc::now();
        let txs = vec![
            Transaction::new(id, TransactionKind::Deposit, 100, base, None),
            Transaction::new(
                id,
                TransactionKind::Withdrawal,
                500,
                base + chrono::Duration::hours(1),
                None,
            ),
            Transaction::new(
                id,
                TransactionKind::Deposit,
                200,
                base + chrono::Duration::hours(2),
                None,
            ),
        ];
        // 100 − 500 clamps to 0, then +200.
        assert_eq!(replay_balance(&txs), 200);
    }

    #[test]
    fn replay_sorts_before_folding() {
        let id = AccountId::new();
        let base = Utc::now();
        let txs = vec![
            Transaction::new(
                id,
                TransactionKind::Withdrawal,
                300,
                base + chrono::Duration::hours(1),
                None,
            ),
            Transaction::new(id, TransactionKind::Deposit, 1_000, base, None),
        ];
        assert_eq!(replay_balance(&txs), 700);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: the running balance at every chronological prefix of a
        /// synthesized history is non-negative.
        #[test]
        fn running_balance_never_goes_negative(seed in any::<u64>()) {
            let history = synthesize(seed, None);

            let mut balance = 0i64;
            for tx in &history {
                balance += tx.signed_amount();
                prop_assert!(
                    balance >= 0,
                    "prefix balance went negative at {}",
                    tx.created_at
                );
            }
            prop_assert_eq!(replay_balance(&history), balance);
        }

        /// Property: all synthesized amounts are strictly positive.
        #[test]
        fn amounts_are_positive(seed in any::<u64>()) {
            for tx in synthesize(seed, None) {
                prop_assert!(tx.amount > 0);
            }
        }
    }
}
