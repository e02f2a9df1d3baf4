//! Users, bank accounts and ledger balances

use crate::ids::UserId;
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Platform role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Donor,
    Admin,
}

impl Role {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(Self::User),
            "donor" => Some(Self::Donor),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// User profile as seen by the payment core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Role,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            email: email.into(),
            full_name: None,
            role: Role::User,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Name to put on a transfer recipient
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.email)
    }
}

/// Bank account a user registered for withdrawals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    pub user_id: UserId,
    pub account_number: String,
    pub account_name: Option<String>,
    /// Human bank name as entered at registration, e.g. "Access Bank"
    pub bank_name: String,
}

/// Ledger balance snapshot for one user.
///
/// `available` can be withdrawn; `held` is reserved by in-flight payouts.
/// Both are always non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub available: Money,
    pub held: Money,
}

impl Account {
    pub fn empty(currency: Currency) -> Self {
        Self {
            available: Money::zero(currency),
            held: Money::zero(currency),
        }
    }

    pub fn currency(&self) -> Currency {
        self.available.currency
    }

    /// Total funds owned by the user (available + held)
    pub fn balance(&self) -> Money {
        Money::new(
            self.available.amount.saturating_add(self.held.amount),
            self.available.currency,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_includes_held() {
        let account = Account {
            available: Money::ngn(10_000),
            held: Money::ngn(5_000),
        };
        assert_eq!(account.balance(), Money::ngn(15_000));
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let user = User::new("u1", "ada@example.com");
        assert_eq!(user.display_name(), "ada@example.com");
        assert_eq!(user.with_name("Ada Obi").display_name(), "Ada Obi");
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!(Role::from_str("Donor"), Some(Role::Donor));
        assert_eq!(Role::from_str("root"), None);
    }
}
