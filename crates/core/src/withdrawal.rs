//! Withdrawal request entity and its terminal state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::id::{OperatorId, WithdrawalId};

/// Withdrawal request lifecycle.
///
/// Transitions are one-way and terminal: pending → approved | rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

impl WithdrawalStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, WithdrawalStatus::Pending)
    }
}

impl core::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Operator decision on a pending withdrawal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalDecision {
    Approve,
    Reject,
}

impl core::fmt::Display for WithdrawalDecision {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            WithdrawalDecision::Approve => "approve",
            WithdrawalDecision::Reject => "reject",
        };
        f.write_str(s)
    }
}

/// A request to withdraw reserved funds.
///
/// The amount was debited from the owning account when the request was
/// created; settlement of the reservation (keep debited vs. credit back)
/// happens on the account when the request is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    id: WithdrawalId,
    /// Amount in smallest currency unit, reserved at creation.
    amount: u64,
    /// Opaque payment method label (e.g. "card").
    method: String,
    /// Free-text destination details; format-checked only, never verified.
    details: String,
    status: WithdrawalStatus,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    processed_by: Option<OperatorId>,
}

impl WithdrawalRequest {
    pub fn pending(
        id: WithdrawalId,
        amount: u64,
        method: impl Into<String>,
        details: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            amount,
            method: method.into(),
            details: details.into(),
            status: WithdrawalStatus::Pending,
            created_at,
            processed_at: None,
            processed_by: None,
        }
    }

    pub fn id(&self) -> WithdrawalId {
        self.id
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn status(&self) -> WithdrawalStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn processed_by(&self) -> Option<OperatorId> {
        self.processed_by
    }

    /// Apply an operator decision.
    ///
    /// Fails with [`LedgerError::AlreadyResolved`] unless the request is
    /// still pending, so a second resolver can tell "already handled by
    /// someone else" apart from "nothing happened".
    pub fn resolve(
        &mut self,
        decision: WithdrawalDecision,
        operator: OperatorId,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        if self.status.is_terminal() {
            return Err(LedgerError::AlreadyResolved {
                status: self.status,
            });
        }

        self.status = match decision {
            WithdrawalDecision::Approve => WithdrawalStatus::Approved,
            WithdrawalDecision::Reject => WithdrawalStatus::Rejected,
        };
        self.processed_at = Some(now);
        self.processed_by = Some(operator);
        Ok(())
    }
}
