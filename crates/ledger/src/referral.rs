//! Referral ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rewardbot_core::{AccountId, LedgerError, ReferralEdge};
use rewardbot_store::AccountStore;

use crate::config::ReferralConfig;
use crate::mutation::mutate_pair;

/// A referral edge together with the credit it paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralCredit {
    pub edge: ReferralEdge,
    pub referred_id: AccountId,
    pub referrer_balance: u64,
}

/// Creates referral edges and credits the referrer.
///
/// The edge lives on the referred account (one slot, fillable once), and the
/// referrer's credit commits in the same both-or-neither store write: a
/// created edge without its credit, or the reverse, is never observable.
#[derive(Debug, Clone)]
pub struct ReferralLedger {
    config: ReferralConfig,
}

impl ReferralLedger {
    pub fn new(config: ReferralConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReferralConfig {
        &self.config
    }

    /// Create the edge for `referred` and credit `referrer`, at most once ever.
    ///
    /// Two concurrent attempts for the same referred account race on its
    /// snapshot version: the loser retries, finds the slot taken, and
    /// reports [`LedgerError::AlreadyReferred`], so exactly one edge and
    /// one credit survive.
    pub fn try_create<S: AccountStore>(
        &self,
        store: &S,
        referrer: AccountId,
        referred: AccountId,
        now: DateTime<Utc>,
    ) -> Result<ReferralCredit, LedgerError> {
        if referrer == referred {
            return Err(LedgerError::SelfReferral);
        }

        let bonus_amount = self.config.bonus_amount;
        let result = mutate_pair(store, referrer, referred, |referrer_acc, referred_acc| {
            if referrer_acc.is_blocked() {
                return Err(LedgerError::AccountBlocked(referrer));
            }

            let edge = ReferralEdge {
                referrer_id: referrer,
                bonus_amount,
                created_at: now,
            };
            referred_acc.link_referrer(edge)?;
            let referrer_balance = referrer_acc.credit_earnings(bonus_amount)?;

            Ok(ReferralCredit {
                edge,
                referred_id: referred,
                referrer_balance,
            })
        });

        match result {
            Ok(credit) => {
                tracing::info!(
                    referrer = %referrer,
                    referred = %referred,
                    bonus = credit.edge.bonus_amount,
                    "referral credited"
                );
                Ok(credit)
            }
            // A missing referrer is its own condition; a missing referred
            // account stays `AccountNotFound` (register it first).
            Err(LedgerError::AccountNotFound(id)) if id == referrer => {
                Err(LedgerError::ReferrerNotFound(id))
            }
            Err(e) => Err(e),
        }
    }
}
