//! Referral edge between two accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::AccountId;

/// The referral link stored on the *referred* account.
///
/// `bonus_amount` is an immutable snapshot of the bonus credited to the
/// referrer at creation time; later configuration changes never touch it.
/// Keeping the edge on the referred side makes "a user can be referred only
/// once, ever" structural: there is exactly one slot to fill.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralEdge {
    pub referrer_id: AccountId,
    /// Amount in smallest currency unit credited to the referrer.
    pub bonus_amount: u64,
    pub created_at: DateTime<Utc>,
}
