//! Investment engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rewardbot_core::{AccountId, AccrualEntry, Investment, InvestmentId, LedgerError, PlanId};
use rewardbot_store::AccountStore;

use crate::config::{InvestmentConfig, InvestmentPlan};
use crate::mutation::{mutate, store_fault};

/// Pure projection of what a plan pays for a given principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentQuote {
    pub plan_id: PlanId,
    pub principal: u64,
    pub profit_per_period: u64,
    pub total_profit: u64,
    pub total_return: u64,
}

/// A freshly opened investment and the balance it left behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentOpened {
    pub investment: Investment,
    pub new_balance: u64,
}

/// One account's share of an accrual pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAccrual {
    pub account_id: AccountId,
    pub total_profit: u64,
    pub new_balance: u64,
    pub entries: Vec<AccrualEntry>,
}

/// Totals of a full accrual sweep across all accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccrualSweep {
    pub accounts_seen: usize,
    pub investments_accrued: usize,
    pub total_profit: u64,
}

/// Creates investments and accrues profit over elapsed time.
#[derive(Debug, Clone)]
pub struct InvestmentEngine {
    config: InvestmentConfig,
}

impl InvestmentEngine {
    pub fn new(config: InvestmentConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InvestmentConfig {
        &self.config
    }

    fn plan(&self, id: &PlanId) -> Result<&InvestmentPlan, LedgerError> {
        self.config
            .plans
            .get(id)
            .ok_or_else(|| LedgerError::UnknownPlan(id.clone()))
    }

    /// Quote a plan for a principal. Pure; used for display and confirmation.
    pub fn quote(&self, plan_id: &PlanId, principal: u64) -> Result<InvestmentQuote, LedgerError> {
        let plan = self.plan(plan_id)?;
        if principal < plan.min_amount || principal > plan.max_amount {
            return Err(LedgerError::InvalidAmount {
                requested: principal,
                minimum: plan.min_amount,
                maximum: plan.max_amount,
            });
        }

        let profit_per_period =
            u64::try_from((principal as u128 * plan.rate_bps as u128) / 10_000)
                .map_err(|_| LedgerError::Overflow)?;
        let total_profit = u64::try_from(profit_per_period as u128 * plan.term_days as u128)
            .map_err(|_| LedgerError::Overflow)?;
        let total_return = principal
            .checked_add(total_profit)
            .ok_or(LedgerError::Overflow)?;

        Ok(InvestmentQuote {
            plan_id: plan_id.clone(),
            principal,
            profit_per_period,
            total_profit,
            total_return,
        })
    }

    /// Open an investment: validate the plan bounds, then atomically debit
    /// the principal and persist the new investment.
    pub fn open<S: AccountStore>(
        &self,
        store: &S,
        id: AccountId,
        plan_id: &PlanId,
        principal: u64,
        now: DateTime<Utc>,
    ) -> Result<InvestmentOpened, LedgerError> {
        // Bounds are checked before funds, so a mis-sized request reports
        // the plan limits even when the balance would not have covered it.
        self.quote(plan_id, principal)?;
        let plan = self.plan(plan_id)?.clone();

        let opened = mutate(store, id, |account| {
            if account.is_blocked() {
                return Err(LedgerError::AccountBlocked(id));
            }

            let investment = Investment::open(
                InvestmentId::new(),
                plan.id.clone(),
                principal,
                plan.rate_bps,
                now,
                plan.term(),
            );
            let new_balance = account.invest(investment.clone())?;

            Ok(InvestmentOpened {
                investment,
                new_balance,
            })
        })?;

        tracing::info!(
            account = %id,
            plan = %plan.id,
            principal,
            "investment opened"
        );
        Ok(opened)
    }

    /// Accrue all of one account's investments up to `now` in one commit.
    pub fn accrue_account<S: AccountStore>(
        &self,
        store: &S,
        id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<AccountAccrual, LedgerError> {
        let period = self.config.accrual_period;
        let outcome = mutate(store, id, |account| account.accrue_investments(now, period))?;

        if outcome.total_profit > 0 {
            tracing::debug!(
                account = %id,
                profit = outcome.total_profit,
                investments = outcome.entries.len(),
                "investment profit accrued"
            );
        }

        Ok(AccountAccrual {
            account_id: id,
            total_profit: outcome.total_profit,
            new_balance: outcome.new_balance,
            entries: outcome.entries,
        })
    }

    /// Accrue every account's investments.
    ///
    /// Accounts are independent: a failure on one is logged and skipped so a
    /// single bad record cannot stall the sweep. No ordering guarantee.
    pub fn accrue_all<S: AccountStore>(
        &self,
        store: &S,
        now: DateTime<Utc>,
    ) -> Result<AccrualSweep, LedgerError> {
        let ids = store.list_ids().map_err(store_fault)?;

        let mut sweep = AccrualSweep::default();
        for id in ids {
            match self.accrue_account(store, id, now) {
                Ok(accrual) => {
                    sweep.accounts_seen += 1;
                    sweep.investments_accrued += accrual.entries.len();
                    sweep.total_profit = sweep.total_profit.saturating_add(accrual.total_profit);
                }
                Err(e) => {
                    tracing::warn!(account = %id, error = %e, "accrual failed, skipping account");
                }
            }
        }

        tracing::info!(
            accounts = sweep.accounts_seen,
            investments = sweep.investments_accrued,
            profit = sweep.total_profit,
            "accrual sweep finished"
        );
        Ok(sweep)
    }
}
