//! Scheme and plan configuration.
//!
//! All configuration is supplied at construction time; the ledger never
//! reads environment variables or files. The `Default` impls carry the
//! scheme's launch constants. Amounts are in smallest currency units.

use std::collections::BTreeMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use rewardbot_core::PlanId;

/// Daily bonus scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BonusConfig {
    /// Fixed amount credited per successful claim.
    pub amount: u64,
    /// Minimum gap between two successful claims.
    pub cooldown: Duration,
    /// A claim within this window of the previous one continues the streak.
    pub streak_window: Duration,
}

impl Default for BonusConfig {
    fn default() -> Self {
        Self {
            amount: 2,
            cooldown: Duration::hours(24),
            streak_window: Duration::hours(48),
        }
    }
}

/// Referral scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralConfig {
    /// Amount credited to the referrer per referred account.
    pub bonus_amount: u64,
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self { bonus_amount: 5 }
    }
}

/// One investment plan on offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentPlan {
    pub id: PlanId,
    pub name: String,
    pub min_amount: u64,
    pub max_amount: u64,
    /// Profit per accrual period in basis points (must satisfy 0 < rate < 10_000).
    pub rate_bps: u32,
    pub term_days: u32,
}

impl InvestmentPlan {
    pub fn term(&self) -> Duration {
        Duration::days(i64::from(self.term_days))
    }
}

/// The catalogue of plans, keyed by plan id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanBook {
    plans: BTreeMap<PlanId, InvestmentPlan>,
}

impl PlanBook {
    pub fn new(plans: impl IntoIterator<Item = InvestmentPlan>) -> Self {
        Self {
            plans: plans.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    pub fn get(&self, id: &PlanId) -> Option<&InvestmentPlan> {
        self.plans.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InvestmentPlan> {
        self.plans.values()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

impl Default for PlanBook {
    /// Basic/advanced/vip at 1%/1.5%/2% per day over a 30-day term. Each
    /// maximum caps the plan at three orders of magnitude above its minimum.
    fn default() -> Self {
        Self::new([
            InvestmentPlan {
                id: PlanId::from("basic"),
                name: "Basic".to_string(),
                min_amount: 100,
                max_amount: 100_000,
                rate_bps: 100,
                term_days: 30,
            },
            InvestmentPlan {
                id: PlanId::from("advanced"),
                name: "Advanced".to_string(),
                min_amount: 500,
                max_amount: 500_000,
                rate_bps: 150,
                term_days: 30,
            },
            InvestmentPlan {
                id: PlanId::from("vip"),
                name: "VIP".to_string(),
                min_amount: 1_000,
                max_amount: 1_000_000,
                rate_bps: 200,
                term_days: 30,
            },
        ])
    }
}

/// Investment scheme: the plan catalogue plus the accrual cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvestmentConfig {
    pub plans: PlanBook,
    /// Length of one accrual period ("day" in the plan rates).
    pub accrual_period: Duration,
}

impl Default for InvestmentConfig {
    fn default() -> Self {
        Self {
            plans: PlanBook::default(),
            accrual_period: Duration::days(1),
        }
    }
}

/// Withdrawal scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalConfig {
    /// Smallest amount a request may ask for (must be at least 1).
    pub min_withdraw: u64,
}

impl Default for WithdrawalConfig {
    fn default() -> Self {
        Self { min_withdraw: 50 }
    }
}

/// Everything the facade needs, bundled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LedgerConfig {
    pub bonus: BonusConfig,
    pub referral: ReferralConfig,
    pub investment: InvestmentConfig,
    pub withdrawal: WithdrawalConfig,
}
