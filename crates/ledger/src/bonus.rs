//! Daily bonus engine.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use rewardbot_core::{Account, AccountId, LedgerError};
use rewardbot_store::AccountStore;

use crate::config::BonusConfig;
use crate::mutation::mutate;

/// Outcome of an eligibility probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BonusEligibility {
    Eligible,
    /// `retry_after` is always strictly positive.
    Ineligible { retry_after: Duration },
}

/// A successful daily-bonus claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusClaim {
    pub amount_credited: u64,
    pub new_balance: u64,
    pub streak: u32,
    pub claimed_at: DateTime<Utc>,
}

/// Computes daily-bonus eligibility and applies the credit.
///
/// Stateless; holds only configuration and may be shared freely.
#[derive(Debug, Clone)]
pub struct BonusEngine {
    config: BonusConfig,
}

impl BonusEngine {
    pub fn new(config: BonusConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BonusConfig {
        &self.config
    }

    /// Eligible iff the account never claimed, or the cooldown has elapsed.
    ///
    /// A non-positive remaining wait means eligible, so `retry_after` can
    /// never come back zero or negative.
    pub fn eligibility(&self, account: &Account, now: DateTime<Utc>) -> BonusEligibility {
        match account.last_bonus_claim_at() {
            None => BonusEligibility::Eligible,
            Some(last) => {
                let retry_after = last + self.config.cooldown - now;
                if retry_after <= Duration::zero() {
                    BonusEligibility::Eligible
                } else {
                    BonusEligibility::Ineligible { retry_after }
                }
            }
        }
    }

    /// The streak value a claim at `now` would record.
    ///
    /// A claim within the streak window of the previous one continues the
    /// run; skipping a window (or never having claimed) starts over at 1.
    fn next_streak(&self, account: &Account, now: DateTime<Utc>) -> u32 {
        match account.last_bonus_claim_at() {
            Some(last) if now - last < self.config.streak_window => {
                account.bonus_streak().saturating_add(1)
            }
            _ => 1,
        }
    }

    /// Claim the daily bonus.
    ///
    /// Eligibility is re-checked inside the atomic mutation, so of N
    /// concurrent claims within one cooldown window exactly one succeeds and
    /// the rest observe [`LedgerError::NotEligible`].
    pub fn claim<S: AccountStore>(
        &self,
        store: &S,
        id: AccountId,
        now: DateTime<Utc>,
    ) -> Result<BonusClaim, LedgerError> {
        let claim = mutate(store, id, |account| {
            if account.is_blocked() {
                return Err(LedgerError::AccountBlocked(id));
            }
            if let BonusEligibility::Ineligible { retry_after } = self.eligibility(account, now) {
                return Err(LedgerError::NotEligible { retry_after });
            }

            let streak = self.next_streak(account, now);
            let new_balance = account.credit_earnings(self.config.amount)?;
            account.record_bonus_claim(now, streak);

            Ok(BonusClaim {
                amount_credited: self.config.amount,
                new_balance,
                streak,
                claimed_at: now,
            })
        })?;

        tracing::info!(
            account = %id,
            amount = claim.amount_credited,
            streak = claim.streak,
            "daily bonus claimed"
        );
        Ok(claim)
    }
}
