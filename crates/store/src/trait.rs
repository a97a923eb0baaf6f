use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use rewardbot_core::{Account, AccountId, ExpectedVersion, WithdrawalId};

/// Account store operation error.
///
/// These are **infrastructure errors** (storage, concurrency) as opposed to
/// domain errors (validation, invariants). The ledger layer retries on
/// `Conflict` and maps everything else it cannot interpret to its own
/// "unavailable" error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic concurrency check failed (snapshot changed since load).
    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    /// No snapshot exists for the account.
    #[error("account {0} not found")]
    NotFound(AccountId),

    /// A snapshot already exists for the account.
    #[error("account {0} already exists")]
    AlreadyExists(AccountId),

    /// The operation itself was malformed (implementation misuse).
    #[error("invalid store operation: {0}")]
    Invalid(String),

    /// The backing storage could not complete the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Versioned snapshot store for accounts.
///
/// One snapshot per account, committed with an optimistic concurrency check
/// against the version loaded by the caller. The ledger's atomic
/// read-modify-write (`mutate`) is built on top of `get` + `update` as a
/// compare-and-swap retry loop.
///
/// ## Commit semantics
///
/// `update()`:
/// - fails with `NotFound` when no snapshot exists
/// - fails with `Conflict` when the stored version no longer matches
///   `expected` (a concurrent commit won); nothing is written
/// - otherwise replaces the snapshot verbatim; the account's own mutating
///   methods already advanced its `version`, the store never rewrites it
///
/// `update_pair()` commits two accounts **both-or-neither**: either both
/// version checks pass and both snapshots are replaced, or neither is. It
/// exists for the single two-account operation in the scheme (crediting a
/// referrer while linking the referred account).
///
/// ## Withdrawal index
///
/// Withdrawal requests live inside their owning account; implementations
/// maintain a reverse index from withdrawal id to account id **inside the
/// same critical section as the snapshot write**, so
/// `account_for_withdrawal` can never observe a half-committed request.
///
/// ## Implementation requirements
///
/// - Enforce the version check and the write under one critical section /
///   transaction (no lost updates under concurrent commits).
/// - Never serialize operations on *different* accounts against each other
///   beyond what the storage primitive itself requires.
/// - Report storage faults as `Unavailable` with state unchanged.
pub trait AccountStore: Send + Sync {
    /// Load the current snapshot, if any.
    fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Persist a brand-new account; fails with `AlreadyExists` on a duplicate.
    fn insert_new(&self, account: Account) -> Result<Account, StoreError>;

    /// Commit a mutated snapshot with an optimistic concurrency check.
    fn update(&self, account: Account, expected: ExpectedVersion) -> Result<(), StoreError>;

    /// Commit two mutated snapshots atomically (both-or-neither).
    fn update_pair(
        &self,
        first: Account,
        expected_first: ExpectedVersion,
        second: Account,
        expected_second: ExpectedVersion,
    ) -> Result<(), StoreError>;

    /// All known account ids (sweeps and statistics; no ordering guarantee).
    fn list_ids(&self) -> Result<Vec<AccountId>, StoreError>;

    /// Reverse lookup from a withdrawal request to its owning account.
    fn account_for_withdrawal(
        &self,
        withdrawal: WithdrawalId,
    ) -> Result<Option<AccountId>, StoreError>;

    /// Load the account, creating it on first contact.
    ///
    /// Losing the create race to a concurrent caller is fine: the winner's
    /// snapshot is re-read and returned, so this never reports `NotFound`
    /// or `AlreadyExists`.
    fn get_or_create(&self, id: AccountId, now: DateTime<Utc>) -> Result<Account, StoreError> {
        if let Some(existing) = self.get(id)? {
            return Ok(existing);
        }
        match self.insert_new(Account::open(id, now)) {
            Ok(created) => Ok(created),
            Err(StoreError::AlreadyExists(_)) => self.get(id)?.ok_or_else(|| {
                StoreError::Unavailable(format!(
                    "account {id} vanished after a concurrent create"
                ))
            }),
            Err(e) => Err(e),
        }
    }
}

impl<S> AccountStore for Arc<S>
where
    S: AccountStore + ?Sized,
{
    fn get(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        (**self).get(id)
    }

    fn insert_new(&self, account: Account) -> Result<Account, StoreError> {
        (**self).insert_new(account)
    }

    fn update(&self, account: Account, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).update(account, expected)
    }

    fn update_pair(
        &self,
        first: Account,
        expected_first: ExpectedVersion,
        second: Account,
        expected_second: ExpectedVersion,
    ) -> Result<(), StoreError> {
        (**self).update_pair(first, expected_first, second, expected_second)
    }

    fn list_ids(&self) -> Result<Vec<AccountId>, StoreError> {
        (**self).list_ids()
    }

    fn account_for_withdrawal(
        &self,
        withdrawal: WithdrawalId,
    ) -> Result<Option<AccountId>, StoreError> {
        (**self).account_for_withdrawal(withdrawal)
    }

    fn get_or_create(&self, id: AccountId, now: DateTime<Utc>) -> Result<Account, StoreError> {
        (**self).get_or_create(id, now)
    }
}
