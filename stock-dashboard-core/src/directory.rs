use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::RwLock;

use crate::domain::{avatar_url, Role, User, UserId, UserStatus};
use crate::error::{CoreError, Result};
use crate::traits::UserDirectory;

/// Process-local user list. Contents reset with the process.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: RwLock::new(users),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// The three demo accounts: `admin`, `user1` and the disabled `user2`.
    pub fn seeded() -> Self {
        Self::new(seed_users())
    }
}

#[allow(clippy::too_many_arguments)]
fn seed_user(
    id: i64,
    username: &str,
    password: &str,
    name: &str,
    role: Role,
    status: UserStatus,
    created: (i32, u32, u32),
    background: &str,
) -> User {
    let (y, m, d) = created;
    let mut label = username.to_string();
    if let Some(first) = label.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    User {
        id: UserId(id),
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password: password.to_string(),
        name: name.to_string(),
        role,
        avatar: avatar_url(&label, background),
        created_at: Utc
            .with_ymd_and_hms(y, m, d, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now),
        last_login: None,
        status,
    }
}

fn seed_users() -> Vec<User> {
    vec![
        seed_user(
            1,
            "admin",
            "admin123",
            "Administrator",
            Role::Admin,
            UserStatus::Active,
            (2024, 1, 1),
            "6366f1",
        ),
        seed_user(
            2,
            "user1",
            "user123",
            "User One",
            Role::User,
            UserStatus::Active,
            (2024, 1, 15),
            "22c55e",
        ),
        seed_user(
            3,
            "user2",
            "user123",
            "User Two",
            Role::User,
            UserStatus::Inactive,
            (2024, 2, 1),
            "f97316",
        ),
    ]
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_login(&self, login: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.matches_login(login)).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn username_taken(&self, username: &str) -> Result<bool> {
        let users = self.users.read().await;
        Ok(users.iter().any(|u| u.username == username))
    }

    async fn email_taken(&self, email: &str) -> Result<bool> {
        let users = self.users.read().await;
        Ok(users.iter().any(|u| u.email == email))
    }

    async fn insert(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.id == user.id) {
            return Err(CoreError::AlreadyExists(format!("user id {}", user.id)));
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User> {
        let mut users = self.users.write().await;
        let slot = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| CoreError::NotFound(format!("user {}", user.id)))?;
        *slot = user.clone();
        Ok(user)
    }

    async fn remove(&self, id: UserId) -> Result<()> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Err(CoreError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>> {
        Ok(self.users.read().await.clone())
    }

    async fn next_id(&self) -> Result<UserId> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .map(|u| u.id)
            .max()
            .map(|id| id.next())
            .unwrap_or(UserId(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seeded_accounts() {
        let dir = InMemoryUserDirectory::seeded();
        let users = dir.list().await.unwrap();

        assert_eq!(users.len(), 3);
        assert!(users[0].is_admin());
        assert_eq!(users[2].status, UserStatus::Inactive);
        assert_eq!(users[1].email, "user1@example.com");
    }

    #[tokio::test]
    async fn test_verify_distinguishes_disabled() {
        let dir = InMemoryUserDirectory::seeded();

        assert!(dir.verify("admin", "admin123").await.is_ok());
        assert!(dir.verify("admin@example.com", "admin123").await.is_ok());
        assert!(matches!(
            dir.verify("admin", "wrong").await,
            Err(CoreError::InvalidCredentials)
        ));
        assert!(matches!(
            dir.verify("user2", "user123").await,
            Err(CoreError::AccountDisabled)
        ));
        assert!(matches!(
            dir.verify("nobody", "user123").await,
            Err(CoreError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_next_id() {
        assert_eq!(InMemoryUserDirectory::seeded().next_id().await.unwrap(), UserId(4));
        assert_eq!(InMemoryUserDirectory::empty().next_id().await.unwrap(), UserId(1));
    }

    #[tokio::test]
    async fn test_remove_missing_user() {
        let dir = InMemoryUserDirectory::seeded();
        assert!(matches!(dir.remove(UserId(99)).await, Err(CoreError::NotFound(_))));
    }
}
