//! The single entry point external collaborators use.

use chrono::{DateTime, Utc};

use rewardbot_core::{
    Account, AccountId, LedgerError, OperatorId, PlanId, WithdrawalDecision, WithdrawalId,
    WithdrawalRequest,
};
use rewardbot_store::AccountStore;

use crate::bonus::{BonusClaim, BonusEligibility, BonusEngine};
use crate::config::{LedgerConfig, PlanBook};
use crate::investment::{
    AccountAccrual, AccrualSweep, InvestmentEngine, InvestmentOpened, InvestmentQuote,
};
use crate::mutation::{mutate, store_fault};
use crate::referral::{ReferralCredit, ReferralLedger};
use crate::stats::{self, AccountStats, GlobalStats};
use crate::withdrawal::{WithdrawalCreated, WithdrawalEngine, WithdrawalResolved};

/// Composes the engines over one store.
///
/// Command handlers call exactly one facade operation per user action and
/// render whatever typed outcome or error comes back. The facade (and
/// everything under it) is synchronous and thread-safe: operations on the
/// same account linearize through the store's version check, operations on
/// different accounts run fully in parallel.
///
/// Callers supply `now` explicitly; the ledger owns no clock, which keeps
/// replays and tests deterministic.
#[derive(Debug, Clone)]
pub struct LedgerFacade<S> {
    store: S,
    bonus: BonusEngine,
    referrals: ReferralLedger,
    investments: InvestmentEngine,
    withdrawals: WithdrawalEngine,
}

impl<S: AccountStore> LedgerFacade<S> {
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self {
            store,
            bonus: BonusEngine::new(config.bonus),
            referrals: ReferralLedger::new(config.referral),
            investments: InvestmentEngine::new(config.investment),
            withdrawals: WithdrawalEngine::new(config.withdrawal),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The plan catalogue, for display.
    pub fn plans(&self) -> &PlanBook {
        &self.investments.config().plans
    }

    /// Load the account for `id`, creating it on first contact.
    pub fn register(&self, id: AccountId, now: DateTime<Utc>) -> Result<Account, LedgerError> {
        self.store.get_or_create(id, now).map_err(store_fault)
    }

    /// Load an existing account.
    pub fn account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.store
            .get(id)
            .map_err(store_fault)?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    pub fn bonus_eligibility(
        &self,
        id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<BonusEligibility, LedgerError> {
        Ok(self.bonus.eligibility(&self.account(id)?, now))
    }

    pub fn claim_daily_bonus(
        &self,
        id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<BonusClaim, LedgerError> {
        self.bonus.claim(&self.store, id, now)
    }

    /// Record that `referred` was brought in by `referrer`, crediting the
    /// referrer. At most once per referred account, ever.
    pub fn link_referral(
        &self,
        referrer: AccountId,
        referred: AccountId,
        now: DateTime<Utc>,
    ) -> Result<ReferralCredit, LedgerError> {
        self.referrals.try_create(&self.store, referrer, referred, now)
    }

    pub fn quote(&self, plan_id: &PlanId, principal: u64) -> Result<InvestmentQuote, LedgerError> {
        self.investments.quote(plan_id, principal)
    }

    pub fn open_investment(
        &self,
        id: AccountId,
        plan_id: &PlanId,
        principal: u64,
        now: DateTime<Utc>,
    ) -> Result<InvestmentOpened, LedgerError> {
        self.investments.open(&self.store, id, plan_id, principal, now)
    }

    pub fn accrue_account(
        &self,
        id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<AccountAccrual, LedgerError> {
        self.investments.accrue_account(&self.store, id, now)
    }

    /// The periodic job: accrue every account's investments.
    pub fn accrue_all(&self, now: DateTime<Utc>) -> Result<AccrualSweep, LedgerError> {
        self.investments.accrue_all(&self.store, now)
    }

    pub fn request_withdrawal(
        &self,
        id: AccountId,
        amount: u64,
        method: &str,
        details: &str,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalCreated, LedgerError> {
        self.withdrawals
            .request(&self.store, id, amount, method, details, now)
    }

    /// Finalize a request. The caller has already authorized `operator`.
    pub fn resolve_withdrawal(
        &self,
        withdrawal: WithdrawalId,
        decision: WithdrawalDecision,
        operator: OperatorId,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalResolved, LedgerError> {
        self.withdrawals
            .resolve(&self.store, withdrawal, decision, operator, now)
    }

    /// One account's outstanding withdrawal requests.
    pub fn pending_withdrawals(&self, id: AccountId) -> Result<Vec<WithdrawalRequest>, LedgerError> {
        self.withdrawals.pending(&self.store, id)
    }

    /// Every outstanding request across the scheme, for the operator queue.
    pub fn all_pending_withdrawals(
        &self,
    ) -> Result<Vec<(AccountId, WithdrawalRequest)>, LedgerError> {
        let mut pending = Vec::new();
        for id in self.store.list_ids().map_err(store_fault)? {
            if let Some(account) = self.store.get(id).map_err(store_fault)? {
                pending.extend(
                    account
                        .pending_withdrawals()
                        .map(|request| (id, request.clone())),
                );
            }
        }
        Ok(pending)
    }

    pub fn block(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.set_blocked(id, true)
    }

    pub fn unblock(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.set_blocked(id, false)
    }

    fn set_blocked(&self, id: AccountId, blocked: bool) -> Result<Account, LedgerError> {
        let account = mutate(&self.store, id, |account| {
            account.set_blocked(blocked);
            Ok(account.clone())
        })?;
        tracing::info!(account = %id, blocked, "account block flag changed");
        Ok(account)
    }

    pub fn account_stats(&self, id: AccountId) -> Result<AccountStats, LedgerError> {
        stats::account_stats(&self.store, id)
    }

    pub fn global_stats(&self) -> Result<GlobalStats, LedgerError> {
        stats::global_stats(&self.store)
    }
}
