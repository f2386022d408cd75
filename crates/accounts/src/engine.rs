//! The ledger engine: provisioning, deposits, withdrawals, queries.

use std::sync::Mutex;

use chrono::Utc;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use mintbank_core::{AccountId, AccountNumber, UserId};

use crate::error::LedgerError;
use crate::model::{Account, Transaction, TransactionKind};
use crate::notify::{AccountCreatedEvent, AccountCreatedNotifier};
use crate::stats::{self, StatementMonth, TransactionStats};
use crate::store::LedgerStore;
use crate::synthesis;

/// Attempts before account number generation gives up.
const MAX_NUMBER_ATTEMPTS: u32 = 10;

/// Request to provision an account.
///
/// `salary: None` selects salary-random synthesis. `account_number: None`
/// asks the engine to generate one.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user_id: UserId,
    pub user_name: Option<String>,
    pub salary: Option<i64>,
    pub account_number: Option<AccountNumber>,
}

impl NewAccount {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            user_name: None,
            salary: None,
            account_number: None,
        }
    }

    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }

    pub fn with_salary(mut self, salary: i64) -> Self {
        self.salary = Some(salary);
        self
    }

    pub fn with_account_number(mut self, number: AccountNumber) -> Self {
        self.account_number = Some(number);
        self
    }
}

/// Pure domain logic over a [`LedgerStore`] and a notification port.
///
/// Owns the balance invariant. Randomness (account numbers, synthesis)
/// comes from an injected seedable RNG so behaviour is reproducible under
/// test; [`LedgerEngine::with_seed`] pins it.
pub struct LedgerEngine<S, N> {
    store: S,
    notifier: N,
    rng: Mutex<ChaCha8Rng>,
}

impl<S, N> LedgerEngine<S, N>
where
    S: LedgerStore,
    N: AccountCreatedNotifier,
{
    /// Engine with OS-entropy-seeded randomness.
    pub fn new(store: S, notifier: N) -> Self {
        Self {
            store,
            notifier,
            rng: Mutex::new(ChaCha8Rng::from_os_rng()),
        }
    }

    /// Engine with pinned randomness, for reproducible runs.
    pub fn with_seed(store: S, notifier: N, seed: u64) -> Self {
        Self {
            store,
            notifier,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Provision an account with a synthesized transaction history.
    ///
    /// Idempotent per user: if the user already has an account it is
    /// returned unchanged and nothing is generated or published. The
    /// account plus its full history are persisted as one atomic unit,
    /// and the persisted balance is the chronological replay of the
    /// generated transactions (clamped at zero).
    pub fn create_account(&self, request: NewAccount) -> Result<Account, LedgerError> {
        if let Some(existing) = self.store.find_by_user_id(request.user_id)? {
            debug!(user_id = %request.user_id, "account already provisioned, returning existing");
            return Ok(existing);
        }

        let account_number = match request.account_number {
            Some(number) => number,
            None => self.generate_account_number()?,
        };

        let now = Utc::now();
        let account_id = AccountId::new();

        let history = {
            let mut rng = self.rng.lock().unwrap();
            synthesis::synthesize_history(&mut rng, account_id, request.salary, now)
        };

        let account = Account {
            id: account_id,
            account_number,
            user_id: request.user_id,
            user_name: request.user_name,
            balance: synthesis::replay_balance(&history),
            salary: request.salary,
            created_at: now,
            updated_at: now,
        };

        self.store.create_account(&account, &history)?;

        info!(
            user_id = %account.user_id,
            account_number = %account.account_number,
            transactions = history.len(),
            balance = account.balance,
            "account provisioned"
        );

        self.notifier.publish_account_created(AccountCreatedEvent {
            user_id: account.user_id,
            user_name: account.user_name.clone(),
            created_at: account.created_at,
        });

        Ok(account)
    }

    /// Add `amount` to the balance and record a deposit transaction.
    ///
    /// Amount positivity is validated at the request boundary, not here.
    pub fn deposit(
        &self,
        user_id: UserId,
        amount: i64,
        memo: Option<String>,
    ) -> Result<Account, LedgerError> {
        let mut account = self.require_account(user_id)?;
        let now = Utc::now();

        account.balance += amount;
        account.updated_at = now;
        let tx = Transaction::new(account.id, TransactionKind::Deposit, amount, now, memo);
        self.store.append_transaction(&account, &tx)?;

        Ok(account)
    }

    /// Subtract `amount` from the balance and record a withdrawal.
    ///
    /// Fails with [`LedgerError::InsufficientBalance`] when `amount`
    /// exceeds the balance; no transaction is recorded in that case.
    pub fn withdraw(
        &self,
        user_id: UserId,
        amount: i64,
        memo: Option<String>,
    ) -> Result<Account, LedgerError> {
        let mut account = self.require_account(user_id)?;
        if account.balance < amount {
            return Err(LedgerError::InsufficientBalance);
        }
        let now = Utc::now();

        account.balance -= amount;
        account.updated_at = now;
        let tx = Transaction::new(account.id, TransactionKind::Withdrawal, amount, now, memo);
        self.store.append_transaction(&account, &tx)?;

        Ok(account)
    }

    /// The account owned by `user_id`.
    pub fn account(&self, user_id: UserId) -> Result<Account, LedgerError> {
        self.require_account(user_id)
    }

    /// All transactions for the user's account, newest first.
    pub fn transactions(&self, user_id: UserId) -> Result<Vec<Transaction>, LedgerError> {
        let account = self.require_account(user_id)?;
        let mut txs = self.store.transactions_for(account.id)?;
        txs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(txs)
    }

    /// Income/expense statistics over the inclusive month range.
    pub fn statistics(
        &self,
        user_id: UserId,
        start: StatementMonth,
        end: StatementMonth,
    ) -> Result<TransactionStats, LedgerError> {
        if start > end {
            return Err(LedgerError::InvalidRange(format!("{start} > {end}")));
        }
        let account = self.require_account(user_id)?;
        let txs = self.store.transactions_for(account.id)?;
        Ok(stats::compute(&txs, start, end))
    }

    fn require_account(&self, user_id: UserId) -> Result<Account, LedgerError> {
        self.store
            .find_by_user_id(user_id)?
            .ok_or(LedgerError::AccountNotFound)
    }

    /// Draw random candidates until one is unused, bounded at
    /// [`MAX_NUMBER_ATTEMPTS`] collisions.
    fn generate_account_number(&self) -> Result<AccountNumber, LedgerError> {
        let mut rng = self.rng.lock().unwrap();
        for _ in 0..MAX_NUMBER_ATTEMPTS {
            let candidate = AccountNumber::random(&mut *rng);
            if !self.store.exists_by_account_number(candidate.as_str())? {
                return Ok(candidate);
            }
        }
        Err(LedgerError::AccountNumberExhausted {
            attempts: MAX_NUMBER_ATTEMPTS,
        })
    }
}
