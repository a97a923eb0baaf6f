use std::collections::HashMap;
use std::sync::RwLock;

use rewardbot_core::{Account, AccountId, ExpectedVersion, WithdrawalId};

use super::r#trait::{AccountStore, StoreError};

/// In-memory account store.
///
/// Intended for tests/dev. Not optimized for performance.
///
/// Lock order is always `accounts` then `withdrawal_index`; readers take a
/// single lock each, so the ordering cannot deadlock.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<AccountId, Account>>,
    withdrawal_index: RwLock<HashMap<WithdrawalId, AccountId>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the account's withdrawals in the reverse index.
    ///
    /// Upserts are idempotent, so re-indexing the full history on every
    /// commit is safe. Must be called while the `accounts` write lock is
    /// still held, so lookups never see a request before its commit.
    fn index_withdrawals(&self, account: &Account) -> Result<(), StoreError> {
        let mut index = self
            .withdrawal_index
            .write()
            .map_err(|_| StoreError::Unavailable("withdrawal index lock poisoned".to_string()))?;
        for request in account.withdrawals() {
            index.insert(request.id(), account.id());
        }
        Ok(())
    }
}

impl AccountStore for InMemoryAccountStore {
    fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| StoreError::Unavailable("account map lock poisoned".to_string()))?;
        Ok(accounts.get(&id).cloned())
    }

    fn insert_new(&self, account: Account) -> Result<Account, StoreError> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| StoreError::Unavailable("account map lock poisoned".to_string()))?;

        if accounts.contains_key(&account.id()) {
            return Err(StoreError::AlreadyExists(account.id()));
        }

        self.index_withdrawals(&account)?;
        accounts.insert(account.id(), account.clone());
        Ok(account)
    }

    fn update(&self, account: Account, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| StoreError::Unavailable("account map lock poisoned".to_string()))?;

        let Some(stored) = accounts.get(&account.id()) else {
            return Err(StoreError::NotFound(account.id()));
        };
        if !expected.matches(stored.version()) {
            return Err(StoreError::Conflict(format!(
                "account {}: expected {expected:?}, found {}",
                account.id(),
                stored.version()
            )));
        }

        self.index_withdrawals(&account)?;
        accounts.insert(account.id(), account);
        Ok(())
    }

    fn update_pair(
        &self,
        first: Account,
        expected_first: ExpectedVersion,
        second: Account,
        expected_second: ExpectedVersion,
    ) -> Result<(), StoreError> {
        if first.id() == second.id() {
            return Err(StoreError::Invalid(
                "update_pair requires two distinct accounts".to_string(),
            ));
        }

        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| StoreError::Unavailable("account map lock poisoned".to_string()))?;

        // Check both versions before writing either snapshot.
        for (account, expected) in [(&first, expected_first), (&second, expected_second)] {
            let Some(stored) = accounts.get(&account.id()) else {
                return Err(StoreError::NotFound(account.id()));
            };
            if !expected.matches(stored.version()) {
                return Err(StoreError::Conflict(format!(
                    "account {}: expected {expected:?}, found {}",
                    account.id(),
                    stored.version()
                )));
            }
        }

        self.index_withdrawals(&first)?;
        self.index_withdrawals(&second)?;
        accounts.insert(first.id(), first);
        accounts.insert(second.id(), second);
        Ok(())
    }

    fn list_ids(&self) -> Result<Vec<AccountId>, StoreError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| StoreError::Unavailable("account map lock poisoned".to_string()))?;
        Ok(accounts.keys().copied().collect())
    }

    fn account_for_withdrawal(
        &self,
        withdrawal: WithdrawalId,
    ) -> Result<Option<AccountId>, StoreError> {
        let index = self
            .withdrawal_index
            .read()
            .map_err(|_| StoreError::Unavailable("withdrawal index lock poisoned".to_string()))?;
        Ok(index.get(&withdrawal).copied())
    }
}
