//! Pay-in transactions
//!
//! ```text
//!            ┌──charge.success──► Complete
//!  Pending ──┤
//!            └──charge.failed───► Failed
//! ```
//!
//! Both outcomes are terminal. The only writer after creation is webhook
//! confirmation, and it goes through a compare-and-set on `Pending`.

use crate::ids::{Reference, UserId};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pay-in status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Complete,
    Failed,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Allowed transitions: pending -> complete, pending -> failed
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Complete) | (Self::Pending, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pay-in attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Gateway correlation key, immutable
    pub reference: Reference,
    /// Recipient of the funds
    pub user_id: UserId,
    /// Payer, when someone donates to `user_id`
    pub donor_email: Option<String>,
    /// Requested amount, immutable
    pub amount: Money,
    pub status: TransactionStatus,
    /// Hosted checkout page returned by the gateway
    pub checkout_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// New pending transaction
    pub fn pending(reference: Reference, user_id: UserId, amount: Money) -> Self {
        let now = Utc::now();
        Self {
            reference,
            user_id,
            donor_email: None,
            amount,
            status: TransactionStatus::Pending,
            checkout_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_donor(mut self, email: impl Into<String>) -> Self {
        self.donor_email = Some(email.into());
        self
    }

    pub fn with_checkout_url(mut self, url: impl Into<String>) -> Self {
        self.checkout_url = Some(url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_pending_transitions() {
        use TransactionStatus::*;
        assert!(Pending.can_transition_to(Complete));
        assert!(Pending.can_transition_to(Failed));
        assert!(!Complete.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Complete));
        assert!(!Complete.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_new_transaction_is_pending() {
        let tx = Transaction::pending(Reference::pay_in(), UserId::new("u1"), Money::ngn(50_000))
            .with_donor("donor@example.com");
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert!(!tx.status.is_terminal());
        assert_eq!(tx.donor_email.as_deref(), Some("donor@example.com"));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&TransactionStatus::Complete).unwrap();
        assert_eq!(json, "\"complete\"");
    }
}
