//! `rewardbot-core` — domain foundation for the reward ledger.
//!
//! This crate contains **pure domain** types and mechanics (no storage or
//! transport concerns): strongly-typed identifiers, the domain error
//! taxonomy, and the Account root aggregate together with the entities it
//! owns (referral edge, investments, withdrawal requests).

pub mod account;
pub mod error;
pub mod id;
pub mod investment;
pub mod referral;
pub mod version;
pub mod withdrawal;

pub use account::{Account, AccrualOutcome};
pub use error::{LedgerError, LedgerResult};
pub use id::{AccountId, InvestmentId, OperatorId, PlanId, WithdrawalId};
pub use investment::{AccrualEntry, Investment};
pub use referral::ReferralEdge;
pub use version::ExpectedVersion;
pub use withdrawal::{WithdrawalDecision, WithdrawalRequest, WithdrawalStatus};
