//! User directory collaborator

use async_trait::async_trait;
use donation_core::{BankAccount, PaymentResult, User, UserId};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Read access to users and their registered bank accounts.
///
/// Signup, login and profile management live outside the payment core.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> PaymentResult<Option<User>>;

    async fn find_by_id(&self, id: &UserId) -> PaymentResult<Option<User>>;

    async fn bank_account(&self, id: &UserId) -> PaymentResult<Option<BankAccount>>;
}

/// In-memory user directory
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: RwLock<HashMap<UserId, User>>,
    banks: RwLock<HashMap<UserId, BankAccount>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: User) {
        self.users.write().insert(user.id.clone(), user);
    }

    pub fn register_bank_account(&self, account: BankAccount) {
        self.banks.write().insert(account.user_id.clone(), account);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> PaymentResult<Option<User>> {
        let email = email.trim();
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: &UserId) -> PaymentResult<Option<User>> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn bank_account(&self, id: &UserId) -> PaymentResult<Option<BankAccount>> {
        Ok(self.banks.read().get(id).cloned())
    }
}
