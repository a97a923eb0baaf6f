//! Atomic account mutation.
//!
//! The `mutate` primitive: load a snapshot, run the closure, and
//! commit with an optimistic concurrency check, retrying from a fresh load
//! when a concurrent commit wins the race. A domain failure inside the
//! closure aborts with no write, so callers observe the operation either
//! fully applied or not at all.

use rewardbot_core::{Account, AccountId, ExpectedVersion, LedgerError};
use rewardbot_store::{AccountStore, StoreError};

/// Map a store fault into the domain error space.
///
/// `Conflict` is deliberately absent: the retry loops below consume it.
pub(crate) fn store_fault(err: StoreError) -> LedgerError {
    match err {
        StoreError::NotFound(id) => LedgerError::AccountNotFound(id),
        other => LedgerError::Unavailable(other.to_string()),
    }
}

/// Atomically read-modify-write one account.
///
/// The closure may run more than once (once per CAS attempt) and must be
/// side-effect free apart from mutating the snapshot it is handed.
pub(crate) fn mutate<S, T, F>(store: &S, id: AccountId, mut f: F) -> Result<T, LedgerError>
where
    S: AccountStore,
    F: FnMut(&mut Account) -> Result<T, LedgerError>,
{
    loop {
        let Some(mut account) = store.get(id).map_err(store_fault)? else {
            return Err(LedgerError::AccountNotFound(id));
        };
        let loaded = account.version();

        let outcome = f(&mut account)?;

        match store.update(account, ExpectedVersion::Exact(loaded)) {
            Ok(()) => return Ok(outcome),
            Err(StoreError::Conflict(_)) => {
                tracing::debug!(account = %id, "concurrent commit won, retrying mutation");
            }
            Err(e) => return Err(store_fault(e)),
        }
    }
}

/// Atomically read-modify-write two distinct accounts (both-or-neither).
///
/// Exists for the single two-account operation in the scheme: crediting a
/// referrer while linking the referred account.
pub(crate) fn mutate_pair<S, T, F>(
    store: &S,
    first: AccountId,
    second: AccountId,
    mut f: F,
) -> Result<T, LedgerError>
where
    S: AccountStore,
    F: FnMut(&mut Account, &mut Account) -> Result<T, LedgerError>,
{
    loop {
        let Some(mut a) = store.get(first).map_err(store_fault)? else {
            return Err(LedgerError::AccountNotFound(first));
        };
        let Some(mut b) = store.get(second).map_err(store_fault)? else {
            return Err(LedgerError::AccountNotFound(second));
        };
        let (loaded_a, loaded_b) = (a.version(), b.version());

        let outcome = f(&mut a, &mut b)?;

        match store.update_pair(
            a,
            ExpectedVersion::Exact(loaded_a),
            b,
            ExpectedVersion::Exact(loaded_b),
        ) {
            Ok(()) => return Ok(outcome),
            Err(StoreError::Conflict(_)) => {
                tracing::debug!(
                    first = %first,
                    second = %second,
                    "concurrent commit won, retrying pair mutation"
                );
            }
            Err(e) => return Err(store_fault(e)),
        }
    }
}
