//! `rewardbot-ledger` — the balance ledger's engines and facade.
//!
//! This crate composes the domain model (`rewardbot-core`) with the storage
//! boundary (`rewardbot-store`) into the operations collaborators call:
//! daily bonus claims, referral crediting, investment opening and accrual,
//! and withdrawal reservation/finalization. Every public operation is atomic
//! with respect to the accounts it touches.

pub mod bonus;
pub mod config;
pub mod facade;
pub mod investment;
mod mutation;
pub mod payment;
pub mod referral;
pub mod stats;
pub mod withdrawal;

pub use bonus::{BonusClaim, BonusEligibility, BonusEngine};
pub use config::{
    BonusConfig, InvestmentConfig, InvestmentPlan, LedgerConfig, PlanBook, ReferralConfig,
    WithdrawalConfig,
};
pub use facade::LedgerFacade;
pub use investment::{AccountAccrual, AccrualSweep, InvestmentEngine, InvestmentOpened, InvestmentQuote};
pub use referral::{ReferralCredit, ReferralLedger};
pub use stats::{AccountStats, GlobalStats};
pub use withdrawal::{WithdrawalCreated, WithdrawalEngine, WithdrawalResolved};
