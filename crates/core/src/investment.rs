//! Investment entity and its time-driven accrual.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::id::{InvestmentId, PlanId};

/// An open (or finished) investment owned by one account.
///
/// The rate is a snapshot taken from the plan at opening time, expressed in
/// basis points per accrual period so that profit stays in integer minor
/// units. `last_accrual_at` only ever advances by whole accrual periods and
/// never past `end_at`; that is what makes [`Investment::accrue`] idempotent
/// and drift-free however irregularly it is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investment {
    id: InvestmentId,
    plan_id: PlanId,
    /// Principal in smallest currency unit, debited at opening.
    principal: u64,
    /// Profit rate per accrual period, in basis points (0 < rate < 10_000).
    rate_bps: u32,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    last_accrual_at: DateTime<Utc>,
    accrued_profit: u64,
    finished: bool,
}

/// One investment's share of an accrual pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualEntry {
    pub investment_id: InvestmentId,
    pub profit: u64,
    pub finished: bool,
}

impl Investment {
    pub fn open(
        id: InvestmentId,
        plan_id: PlanId,
        principal: u64,
        rate_bps: u32,
        start_at: DateTime<Utc>,
        term: Duration,
    ) -> Self {
        debug_assert!(principal > 0, "principal must be positive");
        debug_assert!(
            rate_bps > 0 && rate_bps < 10_000,
            "rate must be a fraction of the principal"
        );

        Self {
            id,
            plan_id,
            principal,
            rate_bps,
            start_at,
            end_at: start_at + term,
            last_accrual_at: start_at,
            accrued_profit: 0,
            finished: false,
        }
    }

    pub fn id(&self) -> InvestmentId {
        self.id
    }

    pub fn plan_id(&self) -> &PlanId {
        &self.plan_id
    }

    pub fn principal(&self) -> u64 {
        self.principal
    }

    pub fn rate_bps(&self) -> u32 {
        self.rate_bps
    }

    pub fn start_at(&self) -> DateTime<Utc> {
        self.start_at
    }

    pub fn end_at(&self) -> DateTime<Utc> {
        self.end_at
    }

    pub fn last_accrual_at(&self) -> DateTime<Utc> {
        self.last_accrual_at
    }

    pub fn accrued_profit(&self) -> u64 {
        self.accrued_profit
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Profit for one whole accrual period, truncated to minor units.
    ///
    /// Truncation (never rounding up) means repeated accrual can lose the
    /// account a bounded fraction, but can never manufacture value.
    pub fn profit_per_period(&self) -> u64 {
        ((self.principal as u128 * self.rate_bps as u128) / 10_000) as u64
    }

    /// Accrue profit for the whole periods elapsed since the last accrual.
    ///
    /// Returns the profit credited by this pass (0 when no whole period has
    /// elapsed; repeated calls are no-ops). The caller credits the returned
    /// amount to the owning account in the same atomic unit that persists
    /// this entity.
    pub fn accrue(&mut self, now: DateTime<Utc>, period: Duration) -> Result<u64, LedgerError> {
        if self.finished {
            return Ok(0);
        }

        let period_secs = period.num_seconds();
        debug_assert!(period_secs > 0, "accrual period must be positive");

        let horizon = now.min(self.end_at);
        let elapsed_secs = (horizon - self.last_accrual_at).num_seconds();
        let units = if period_secs > 0 {
            elapsed_secs / period_secs
        } else {
            0
        };

        let mut credited = 0u64;
        if units > 0 {
            let profit = self.profit_per_period() as u128 * units as u128;
            let profit = u64::try_from(profit).map_err(|_| LedgerError::Overflow)?;
            self.accrued_profit = self
                .accrued_profit
                .checked_add(profit)
                .ok_or(LedgerError::Overflow)?;

            // Advance by exactly the accrued whole periods, never from `now`.
            let step_secs = units.checked_mul(period_secs).ok_or(LedgerError::Overflow)?;
            self.last_accrual_at = self
                .last_accrual_at
                .checked_add_signed(Duration::seconds(step_secs))
                .ok_or(LedgerError::Overflow)?;

            credited = profit;
        }

        // Any sub-period tail at the term boundary truncates to zero profit.
        if now >= self.end_at {
            self.finished = true;
        }

        Ok(credited)
    }
}
