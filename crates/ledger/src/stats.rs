//! Read-only statistics assembled by scanning the store.
//!
//! Nothing here is used for correctness checks; sums saturate rather than
//! error because a truncated headline number beats a failed admin panel.
//! Every figure is read fresh from the store (no caching).

use serde::{Deserialize, Serialize};

use rewardbot_core::{Account, AccountId, LedgerError};
use rewardbot_store::AccountStore;

use crate::mutation::store_fault;

/// One account's panel numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStats {
    pub account_id: AccountId,
    pub balance: u64,
    pub total_earned: u64,
    pub total_withdrawn: u64,
    pub total_invested: u64,
    pub referral_count: usize,
    pub active_investments: usize,
    pub investment_profit: u64,
    pub pending_withdrawals: usize,
}

/// Scheme-wide totals for the operator panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GlobalStats {
    pub accounts: usize,
    pub blocked_accounts: usize,
    pub total_balance: u64,
    pub total_earned: u64,
    pub total_withdrawn: u64,
    pub total_invested: u64,
    pub total_investment_profit: u64,
    pub pending_withdrawals: usize,
    pub reserved_amount: u64,
}

fn load_all<S: AccountStore>(store: &S) -> Result<Vec<Account>, LedgerError> {
    let mut accounts = Vec::new();
    for id in store.list_ids().map_err(store_fault)? {
        // Accounts are never deleted, but the scan tolerates a miss anyway.
        if let Some(account) = store.get(id).map_err(store_fault)? {
            accounts.push(account);
        }
    }
    Ok(accounts)
}

/// Panel numbers for one account.
///
/// The referral count is a scan over all accounts' edges; this is an
/// operator/profile view, not a hot path.
pub(crate) fn account_stats<S: AccountStore>(
    store: &S,
    id: AccountId,
) -> Result<AccountStats, LedgerError> {
    let account = store
        .get(id)
        .map_err(store_fault)?
        .ok_or(LedgerError::AccountNotFound(id))?;

    let referral_count = load_all(store)?
        .iter()
        .filter(|other| other.referred_by().is_some_and(|edge| edge.referrer_id == id))
        .count();

    Ok(AccountStats {
        account_id: id,
        balance: account.balance(),
        total_earned: account.total_earned(),
        total_withdrawn: account.total_withdrawn(),
        total_invested: account.total_invested(),
        referral_count,
        active_investments: account.active_investments().count(),
        investment_profit: account.investment_profit(),
        pending_withdrawals: account.pending_withdrawals().count(),
    })
}

/// Scheme-wide totals.
pub(crate) fn global_stats<S: AccountStore>(store: &S) -> Result<GlobalStats, LedgerError> {
    let mut stats = GlobalStats::default();

    for account in load_all(store)? {
        stats.accounts += 1;
        if account.is_blocked() {
            stats.blocked_accounts += 1;
        }
        stats.total_balance = stats.total_balance.saturating_add(account.balance());
        stats.total_earned = stats.total_earned.saturating_add(account.total_earned());
        stats.total_withdrawn = stats
            .total_withdrawn
            .saturating_add(account.total_withdrawn());
        stats.total_invested = stats
            .total_invested
            .saturating_add(account.total_invested());
        stats.total_investment_profit = stats
            .total_investment_profit
            .saturating_add(account.investment_profit());

        for request in account.pending_withdrawals() {
            stats.pending_withdrawals += 1;
            stats.reserved_amount = stats.reserved_amount.saturating_add(request.amount());
        }
    }

    Ok(stats)
}
