//! Payout (withdrawal) attempts
//!
//! ```text
//!  Held ──transfer issued──► Processing ──transfer.success──► Succeeded (hold captured)
//!   │                            │
//!   │                            └──transfer.failed/reversed──► Failed (hold released)
//!   └──gateway rejected─────────────────────────────────────────► Failed (hold released)
//! ```
//!
//! A gateway that confirms synchronously moves `Held` straight to `Succeeded`.

use crate::ids::{Reference, UserId};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payout status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    /// Funds held, transfer not yet issued
    Held,
    /// Transfer issued, outcome pending at the gateway
    Processing,
    /// Transfer confirmed, balance debited
    Succeeded,
    /// Transfer failed, hold released
    Failed,
}

impl PayoutStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn can_transition_to(&self, next: PayoutStatus) -> bool {
        use PayoutStatus::*;
        matches!(
            (self, next),
            (Held, Processing)
                | (Held, Succeeded)
                | (Held, Failed)
                | (Processing, Succeeded)
                | (Processing, Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Held => "held",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination of a payout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub recipient_code: String,
    pub account_number: String,
    pub account_name: String,
    pub bank_code: String,
}

/// One withdrawal attempt; lives as long as the hold it owns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutAttempt {
    pub reference: Reference,
    pub user_id: UserId,
    pub amount: Money,
    pub recipient: Recipient,
    pub status: PayoutStatus,
    /// Gateway transfer code once issued
    pub transfer_code: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PayoutAttempt {
    pub fn held(reference: Reference, user_id: UserId, amount: Money, recipient: Recipient) -> Self {
        let now = Utc::now();
        Self {
            reference,
            user_id,
            amount,
            recipient,
            status: PayoutStatus::Held,
            transfer_code: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }
}
