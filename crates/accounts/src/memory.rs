//! In-memory ledger store for tests/dev.

use std::collections::HashMap;
use std::sync::RwLock;

use mintbank_core::{AccountId, UserId};

use crate::model::{Account, Transaction};
use crate::store::{LedgerStore, LedgerStoreError};

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<AccountId, Account>,
    by_user: HashMap<UserId, AccountId>,
    by_number: HashMap<String, AccountId>,
    transactions: HashMap<AccountId, Vec<Transaction>>,
}

/// In-memory ledger store.
///
/// A single `RwLock` over all indexes makes the composite operations
/// (`create_account`, `append_transaction`) atomic with respect to readers.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<Inner>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts.
    pub fn account_count(&self) -> usize {
        self.read().map(|inner| inner.accounts.len()).unwrap_or(0)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, LedgerStoreError> {
        self.inner
            .read()
            .map_err(|_| LedgerStoreError::Storage("ledger store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, LedgerStoreError> {
        self.inner
            .write()
            .map_err(|_| LedgerStoreError::Storage("ledger store lock poisoned".to_string()))
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn create_account(
        &self,
        account: &Account,
        history: &[Transaction],
    ) -> Result<(), LedgerStoreError> {
        let mut inner = self.write()?;

        if inner.by_user.contains_key(&account.user_id) {
            return Err(LedgerStoreError::Conflict(format!(
                "user {} already has an account",
                account.user_id
            )));
        }
        if inner.by_number.contains_key(account.account_number.as_str()) {
            return Err(LedgerStoreError::Conflict(format!(
                "account number {} already taken",
                account.account_number
            )));
        }

        inner.by_user.insert(account.user_id, account.id);
        inner
            .by_number
            .insert(account.account_number.as_str().to_string(), account.id);
        inner.accounts.insert(account.id, account.clone());
        inner.transactions.insert(account.id, history.to_vec());
        Ok(())
    }

    fn append_transaction(
        &self,
        account: &Account,
        tx: &Transaction,
    ) -> Result<(), LedgerStoreError> {
        let mut inner = self.write()?;

        if !inner.accounts.contains_key(&account.id) {
            return Err(LedgerStoreError::Storage(format!(
                "unknown account {}",
                account.id
            )));
        }

        inner.accounts.insert(account.id, account.clone());
        inner
            .transactions
            .entry(account.id)
            .or_default()
            .push(tx.clone());
        Ok(())
    }

    fn find_by_user_id(&self, user_id: UserId) -> Result<Option<Account>, LedgerStoreError> {
        let inner = self.read()?;
        Ok(inner
            .by_user
            .get(&user_id)
            .and_then(|id| inner.accounts.get(id))
            .cloned())
    }

    fn find_by_account_number(&self, number: &str) -> Result<Option<Account>, LedgerStoreError> {
        let inner = self.read()?;
        Ok(inner
            .by_number
            .get(number)
            .and_then(|id| inner.accounts.get(id))
            .cloned())
    }

    fn exists_by_account_number(&self, number: &str) -> Result<bool, LedgerStoreError> {
        Ok(self.read()?.by_number.contains_key(number))
    }

    fn transactions_for(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, LedgerStoreError> {
        let inner = self.read()?;
        Ok(inner
            .transactions
            .get(&account_id)
            .cloned()
            .unwrap_or_default())
    }
}
