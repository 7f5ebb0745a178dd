use async_trait::async_trait;

use crate::domain::{User, UserId};
use crate::error::{CoreError, Result};

/// Source of user accounts behind the auth store.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Looks an account up by username or email.
    async fn find_by_login(&self, login: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;

    async fn username_taken(&self, username: &str) -> Result<bool>;

    async fn email_taken(&self, email: &str) -> Result<bool>;

    async fn insert(&self, user: User) -> Result<User>;

    /// Replaces the stored record with the same id.
    async fn update(&self, user: User) -> Result<User>;

    async fn remove(&self, id: UserId) -> Result<()>;

    async fn list(&self) -> Result<Vec<User>>;

    /// One past the largest id in the directory.
    async fn next_id(&self) -> Result<UserId>;

    /// Matches credentials against the directory. Inactive accounts are
    /// reported separately from unknown ones.
    async fn verify(&self, login: &str, password: &str) -> Result<User> {
        match self.find_by_login(login).await? {
            Some(user) if user.password == password => {
                if user.is_active() {
                    Ok(user)
                } else {
                    Err(CoreError::AccountDisabled)
                }
            }
            _ => Err(CoreError::InvalidCredentials),
        }
    }
}

/// Single-slot persistence for the active session.
#[cfg_attr(test, mockall::automock)]
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, value: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}
