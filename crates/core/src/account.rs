//! Account root aggregate.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::id::{AccountId, OperatorId, WithdrawalId};
use crate::investment::{AccrualEntry, Investment};
use crate::referral::ReferralEdge;
use crate::withdrawal::{WithdrawalDecision, WithdrawalRequest, WithdrawalStatus};

/// The ledger's representation of one external user.
///
/// Account is the root aggregate for all balance mutations: the investments
/// and withdrawal requests it owns live inside the record, so a debit plus
/// an entity insert is a single snapshot write and a crash between the two
/// is impossible by construction.
///
/// `balance` can never go negative: it is unsigned and every debit checks
/// first. The `total_*` accumulators are informational monotone counters and
/// are never used for correctness checks. `version` is bumped by every
/// mutating method and is what the store's compare-and-swap commit keys on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    /// Spendable balance in smallest currency unit.
    balance: u64,
    total_earned: u64,
    total_withdrawn: u64,
    total_invested: u64,
    last_bonus_claim_at: Option<DateTime<Utc>>,
    bonus_streak: u32,
    referred_by: Option<ReferralEdge>,
    investments: Vec<Investment>,
    withdrawals: Vec<WithdrawalRequest>,
    is_blocked: bool,
    created_at: DateTime<Utc>,
    version: u64,
}

/// Result of one account-level accrual pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualOutcome {
    pub total_profit: u64,
    pub new_balance: u64,
    pub entries: Vec<AccrualEntry>,
}

impl Account {
    /// Open a fresh account. Called exactly once per external identifier.
    pub fn open(id: AccountId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            balance: 0,
            total_earned: 0,
            total_withdrawn: 0,
            total_invested: 0,
            last_bonus_claim_at: None,
            bonus_streak: 0,
            referred_by: None,
            investments: Vec::new(),
            withdrawals: Vec::new(),
            is_blocked: false,
            created_at: now,
            version: 0,
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn total_earned(&self) -> u64 {
        self.total_earned
    }

    pub fn total_withdrawn(&self) -> u64 {
        self.total_withdrawn
    }

    pub fn total_invested(&self) -> u64 {
        self.total_invested
    }

    pub fn last_bonus_claim_at(&self) -> Option<DateTime<Utc>> {
        self.last_bonus_claim_at
    }

    pub fn bonus_streak(&self) -> u32 {
        self.bonus_streak
    }

    pub fn referred_by(&self) -> Option<&ReferralEdge> {
        self.referred_by.as_ref()
    }

    pub fn investments(&self) -> &[Investment] {
        &self.investments
    }

    pub fn withdrawals(&self) -> &[WithdrawalRequest] {
        &self.withdrawals
    }

    pub fn is_blocked(&self) -> bool {
        self.is_blocked
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Snapshot version for optimistic concurrency (+1 per mutating call).
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn active_investments(&self) -> impl Iterator<Item = &Investment> {
        self.investments.iter().filter(|inv| !inv.is_finished())
    }

    pub fn pending_withdrawals(&self) -> impl Iterator<Item = &WithdrawalRequest> {
        self.withdrawals
            .iter()
            .filter(|w| w.status() == WithdrawalStatus::Pending)
    }

    /// Total accrued investment profit over the account's lifetime.
    pub fn investment_profit(&self) -> u64 {
        self.investments
            .iter()
            .fold(0u64, |acc, inv| acc.saturating_add(inv.accrued_profit()))
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    /// Credit earnings: adds to both `balance` and `total_earned`.
    pub fn credit_earnings(&mut self, amount: u64) -> Result<u64, LedgerError> {
        let balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let total_earned = self
            .total_earned
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.balance = balance;
        self.total_earned = total_earned;
        self.touch();
        Ok(self.balance)
    }

    /// Debit spendable funds; fails without mutation when they don't cover.
    pub fn debit(&mut self, amount: u64) -> Result<u64, LedgerError> {
        if amount > self.balance {
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        self.touch();
        Ok(self.balance)
    }

    /// Record a successful daily-bonus claim.
    pub fn record_bonus_claim(&mut self, now: DateTime<Utc>, streak: u32) {
        self.last_bonus_claim_at = Some(now);
        self.bonus_streak = streak;
        self.touch();
    }

    /// Attach the referral edge; an account can carry at most one, ever.
    pub fn link_referrer(&mut self, edge: ReferralEdge) -> Result<(), LedgerError> {
        if edge.referrer_id == self.id {
            return Err(LedgerError::SelfReferral);
        }
        if self.referred_by.is_some() {
            return Err(LedgerError::AlreadyReferred { referred: self.id });
        }
        self.referred_by = Some(edge);
        self.touch();
        Ok(())
    }

    /// Debit the principal and take ownership of the new investment.
    pub fn invest(&mut self, investment: Investment) -> Result<u64, LedgerError> {
        let principal = investment.principal();
        self.debit(principal)?;
        self.total_invested = self
            .total_invested
            .checked_add(principal)
            .ok_or(LedgerError::Overflow)?;
        self.investments.push(investment);
        Ok(self.balance)
    }

    /// Accrue every owned investment up to `now` and credit the sum.
    ///
    /// Each investment accrues independently; the balance credit for the
    /// whole pass lands in this same snapshot, so compute and write cannot
    /// be torn apart.
    pub fn accrue_investments(
        &mut self,
        now: DateTime<Utc>,
        period: Duration,
    ) -> Result<AccrualOutcome, LedgerError> {
        let mut entries = Vec::new();
        let mut total: u64 = 0;

        for investment in &mut self.investments {
            let was_finished = investment.is_finished();
            let profit = investment.accrue(now, period)?;
            let finished_now = !was_finished && investment.is_finished();
            if profit > 0 || finished_now {
                entries.push(AccrualEntry {
                    investment_id: investment.id(),
                    profit,
                    finished: investment.is_finished(),
                });
            }
            total = total.checked_add(profit).ok_or(LedgerError::Overflow)?;
        }

        let new_balance = if total > 0 {
            self.credit_earnings(total)?
        } else {
            if !entries.is_empty() {
                self.touch();
            }
            self.balance
        };

        Ok(AccrualOutcome {
            total_profit: total,
            new_balance,
            entries,
        })
    }

    /// Debit (reserve) the request amount and take ownership of the request.
    pub fn reserve_withdrawal(&mut self, request: WithdrawalRequest) -> Result<u64, LedgerError> {
        self.debit(request.amount())?;
        self.withdrawals.push(request);
        Ok(self.balance)
    }

    /// Finalize one owned withdrawal request.
    ///
    /// Approve keeps the reservation debited and moves the amount into
    /// `total_withdrawn`; reject credits the reservation back to `balance`
    /// (and only to `balance`; a refund is not an earning).
    pub fn resolve_withdrawal(
        &mut self,
        id: WithdrawalId,
        decision: WithdrawalDecision,
        operator: OperatorId,
        now: DateTime<Utc>,
    ) -> Result<WithdrawalRequest, LedgerError> {
        let Some(pos) = self.withdrawals.iter().position(|w| w.id() == id) else {
            return Err(LedgerError::WithdrawalNotFound(id));
        };

        self.withdrawals[pos].resolve(decision, operator, now)?;
        let amount = self.withdrawals[pos].amount();

        match decision {
            WithdrawalDecision::Approve => {
                self.total_withdrawn = self
                    .total_withdrawn
                    .checked_add(amount)
                    .ok_or(LedgerError::Overflow)?;
            }
            WithdrawalDecision::Reject => {
                self.balance = self
                    .balance
                    .checked_add(amount)
                    .ok_or(LedgerError::Overflow)?;
            }
        }

        self.touch();
        Ok(self.withdrawals[pos].clone())
    }

    pub fn set_blocked(&mut self, blocked: bool) {
        if self.is_blocked != blocked {
            self.is_blocked = blocked;
            self.touch();
        }
    }
}
