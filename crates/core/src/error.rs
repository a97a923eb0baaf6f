//! Domain error model.

use chrono::Duration;
use thiserror::Error;

use crate::id::{AccountId, PlanId, WithdrawalId};
use crate::withdrawal::WithdrawalStatus;

/// Result type used across the ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Domain-level error.
///
/// Every variant except [`LedgerError::Unavailable`] is a deterministic,
/// expected outcome of an operation: validation failures, conflicts from a
/// duplicate or concurrent attempt, and lookups that missed. `Unavailable`
/// is the one infrastructure escape hatch: the store could not be reached
/// and the whole operation may be retried (no partial state was written).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// No account exists for the given identifier.
    #[error("account {0} not found")]
    AccountNotFound(AccountId),

    /// The account is blocked and refuses balance-affecting user operations.
    #[error("account {0} is blocked")]
    AccountBlocked(AccountId),

    /// Daily bonus already claimed within the cooldown window.
    #[error("daily bonus not eligible for another {retry_after}")]
    NotEligible { retry_after: Duration },

    /// A debit larger than the spendable balance was requested.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: u64, available: u64 },

    /// Withdrawal amount below the configured minimum.
    #[error("amount {requested} is below the minimum of {minimum}")]
    BelowMinimum { requested: u64, minimum: u64 },

    /// Investment principal outside the plan bounds.
    #[error("amount {requested} is outside the plan bounds {minimum}..={maximum}")]
    InvalidAmount {
        requested: u64,
        minimum: u64,
        maximum: u64,
    },

    /// No plan is configured under the given id.
    #[error("unknown investment plan: {0}")]
    UnknownPlan(PlanId),

    /// An account tried to refer itself.
    #[error("an account cannot refer itself")]
    SelfReferral,

    /// The referred account already carries a referral edge.
    #[error("account {referred} was already referred")]
    AlreadyReferred { referred: AccountId },

    /// The referring account does not exist.
    #[error("referrer {0} not found")]
    ReferrerNotFound(AccountId),

    /// No withdrawal request exists under the given id.
    #[error("withdrawal request {0} not found")]
    WithdrawalNotFound(WithdrawalId),

    /// The withdrawal request was already finalized by an earlier decision.
    #[error("withdrawal request already resolved as {status}")]
    AlreadyResolved { status: WithdrawalStatus },

    /// Payment details failed the per-method format check.
    #[error("invalid payment details for method '{method}': {reason}")]
    InvalidDetails { method: String, reason: String },

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Checked amount arithmetic overflowed.
    #[error("amount arithmetic overflow")]
    Overflow,

    /// The durable store could not complete the operation; state is unchanged.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
