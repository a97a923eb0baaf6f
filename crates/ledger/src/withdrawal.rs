//! Withdrawal engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rewardbot_core::{
    AccountId, LedgerError, OperatorId, WithdrawalDecision, WithdrawalId, WithdrawalRequest,
};
use rewardbot_store::AccountStore;

use crate::config::WithdrawalConfig;
use crate::mutation::{mutate, store_fault};
use crate::payment;

/// A freshly created (pending) withdrawal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalCreated {
    pub request: WithdrawalRequest,
    pub new_balance: u64,
}

/// A finalized withdrawal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalResolved {
    pub account_id: AccountId,
    pub request: WithdrawalRequest,
    pub new_balance: u64,
}

/// Creates withdrawal requests (reserving the funds) and finalizes them.
#[derive(Debug, Clone)]
pub struct WithdrawalEngine {
    config: WithdrawalConfig,
}

impl WithdrawalEngine {
    pub fn new(config: WithdrawalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WithdrawalConfig {
        &self.config
    }

    /// Create a pending request, debiting the amount immediately.
    ///
    /// Reserving at request time keeps the displayed balance from ever
    /// overstating spendable funds while a request is outstanding. The
    /// debit and the request insert are one snapshot commit.
    pub fn request<S: AccountStore>(
        &self,
        store: &S,
        id: AccountId,
        amount: u64,
        method: &str,
        details: &str,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalCreated, LedgerError> {
        if amount < self.config.min_withdraw {
            return Err(LedgerError::BelowMinimum {
                requested: amount,
                minimum: self.config.min_withdraw,
            });
        }
        payment::validate_details(method, details)?;

        let created = mutate(store, id, |account| {
            if account.is_blocked() {
                return Err(LedgerError::AccountBlocked(id));
            }

            let request =
                WithdrawalRequest::pending(WithdrawalId::new(), amount, method, details, now);
            let new_balance = account.reserve_withdrawal(request.clone())?;

            Ok(WithdrawalCreated {
                request,
                new_balance,
            })
        })?;

        tracing::info!(
            account = %id,
            withdrawal = %created.request.id(),
            amount,
            method,
            "withdrawal requested"
        );
        Ok(created)
    }

    /// Finalize a pending request, exactly once.
    ///
    /// The pending check runs inside the same atomic mutation that writes
    /// the terminal status, so a racing second operator observes
    /// [`LedgerError::AlreadyResolved`] rather than a silent no-op.
    pub fn resolve<S: AccountStore>(
        &self,
        store: &S,
        withdrawal: WithdrawalId,
        decision: WithdrawalDecision,
        operator: OperatorId,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalResolved, LedgerError> {
        let Some(account_id) = store
            .account_for_withdrawal(withdrawal)
            .map_err(store_fault)?
        else {
            return Err(LedgerError::WithdrawalNotFound(withdrawal));
        };

        let resolved = mutate(store, account_id, |account| {
            let request = account.resolve_withdrawal(withdrawal, decision, operator, now)?;
            Ok(WithdrawalResolved {
                account_id,
                request,
                new_balance: account.balance(),
            })
        })?;

        tracing::info!(
            account = %account_id,
            withdrawal = %withdrawal,
            decision = %decision,
            operator = %operator,
            "withdrawal resolved"
        );
        Ok(resolved)
    }

    /// One account's outstanding requests, oldest first.
    pub fn pending<S: AccountStore>(
        &self,
        store: &S,
        id: AccountId,
    ) -> Result<Vec<WithdrawalRequest>, LedgerError> {
        let account = store
            .get(id)
            .map_err(store_fault)?
            .ok_or(LedgerError::AccountNotFound(id))?;
        Ok(account.pending_withdrawals().cloned().collect())
    }
}
