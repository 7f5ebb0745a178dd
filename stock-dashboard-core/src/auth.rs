//! Session context: who is logged in, and the account management operations
//! gated on that identity.

use chrono::Utc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::domain::{
    avatar_url, LoginRequest, NewUser, RegisterRequest, Role, SessionUser, User, UserId,
    UserStatus, UserUpdate,
};
use crate::error::{CoreError, Result};
use crate::traits::{SessionStorage, UserDirectory};

pub const LOGIN_ROUTE: &str = "/auth/login";
pub const HOME_ROUTE: &str = "/";

/// Password given to accounts created through [`AuthStore::add_user`].
pub const DEFAULT_PASSWORD: &str = "user123";

const REGISTER_AVATAR_BACKGROUND: &str = "6366f1";

/// Result of a route guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    Proceed,
    Redirect(&'static str),
}

pub struct AuthStore<D, S> {
    directory: D,
    storage: S,
    session: RwLock<Option<SessionUser>>,
    latency: Option<Duration>,
}

impl<D, S> AuthStore<D, S>
where
    D: UserDirectory,
    S: SessionStorage,
{
    pub fn new(directory: D, storage: S) -> Self {
        Self {
            directory,
            storage,
            session: RwLock::new(None),
            latency: None,
        }
    }

    /// Adds an artificial delay before login and register, mimicking a remote identity service.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub async fn current_user(&self) -> Option<SessionUser> {
        self.session.read().await.clone()
    }

    pub async fn is_logged_in(&self) -> bool {
        self.session.read().await.is_some()
    }

    pub async fn is_admin(&self) -> bool {
        self.session
            .read()
            .await
            .as_ref()
            .map(SessionUser::is_admin)
            .unwrap_or(false)
    }

    pub async fn login(&self, credentials: LoginRequest) -> Result<SessionUser> {
        self.simulate_latency().await;

        let mut user = self
            .directory
            .verify(&credentials.username, &credentials.password)
            .await?;

        user.last_login = Some(Utc::now());
        let user = self.directory.update(user).await?;

        let session = user.to_session();
        self.set_session(session.clone()).await?;

        info!(user_id = %session.id, username = %session.username, "User logged in");
        Ok(session)
    }

    /// Creates a regular account and logs it in.
    pub async fn register(&self, request: RegisterRequest) -> Result<SessionUser> {
        request.validate()?;
        self.simulate_latency().await;

        if self.directory.username_taken(&request.username).await?
            || self.directory.email_taken(&request.email).await?
        {
            return Err(CoreError::AlreadyExists(
                "username or email already registered".to_string(),
            ));
        }

        let now = Utc::now();
        let name = request.display_name().to_string();
        let user = User {
            id: self.directory.next_id().await?,
            username: request.username.clone(),
            email: request.email.clone(),
            password: request.password.clone(),
            avatar: avatar_url(&name, REGISTER_AVATAR_BACKGROUND),
            name,
            role: Role::User,
            created_at: now,
            last_login: Some(now),
            status: UserStatus::Active,
        };
        let user = self.directory.insert(user).await?;

        let session = user.to_session();
        self.set_session(session.clone()).await?;

        info!(user_id = %session.id, username = %session.username, "User registered");
        Ok(session)
    }

    /// Ends the session and returns where the caller should navigate next.
    pub async fn logout(&self) -> Result<&'static str> {
        let previous = self.session.write().await.take();
        self.storage.clear()?;

        if let Some(user) = previous {
            info!(user_id = %user.id, "User logged out");
        }
        Ok(LOGIN_ROUTE)
    }

    /// Restores the session persisted by an earlier process, if any.
    pub async fn initialize(&self) -> Result<Option<SessionUser>> {
        let Some(raw) = self.storage.load()? else {
            return Ok(None);
        };

        match serde_json::from_str::<SessionUser>(&raw) {
            Ok(user) => {
                debug!(user_id = %user.id, "Restored session from storage");
                *self.session.write().await = Some(user.clone());
                Ok(Some(user))
            }
            Err(e) => {
                warn!(error = %e, "Discarding unreadable session data");
                self.storage.clear()?;
                *self.session.write().await = None;
                Ok(None)
            }
        }
    }

    pub async fn require_auth(&self) -> Result<GuardOutcome> {
        self.initialize().await?;
        Ok(if self.is_logged_in().await {
            GuardOutcome::Proceed
        } else {
            GuardOutcome::Redirect(LOGIN_ROUTE)
        })
    }

    pub async fn require_guest(&self) -> Result<GuardOutcome> {
        self.initialize().await?;
        Ok(if self.is_logged_in().await {
            GuardOutcome::Redirect(HOME_ROUTE)
        } else {
            GuardOutcome::Proceed
        })
    }

    pub async fn all_users(&self) -> Result<Vec<SessionUser>> {
        self.ensure_admin().await?;
        let users = self.directory.list().await?;
        Ok(users.iter().map(SessionUser::from).collect())
    }

    pub async fn add_user(&self, new_user: NewUser) -> Result<SessionUser> {
        self.ensure_admin().await?;
        new_user.validate()?;

        if self.directory.username_taken(&new_user.username).await? {
            return Err(CoreError::AlreadyExists(format!(
                "username {}",
                new_user.username
            )));
        }
        if self.directory.email_taken(&new_user.email).await? {
            return Err(CoreError::AlreadyExists(format!("email {}", new_user.email)));
        }

        let avatar = new_user
            .avatar
            .clone()
            .unwrap_or_else(|| avatar_url(&new_user.name, REGISTER_AVATAR_BACKGROUND));
        let user = User {
            id: self.directory.next_id().await?,
            username: new_user.username,
            email: new_user.email,
            password: DEFAULT_PASSWORD.to_string(),
            name: new_user.name,
            role: new_user.role,
            avatar,
            created_at: Utc::now(),
            last_login: None,
            status: new_user.status,
        };
        let user = self.directory.insert(user).await?;

        info!(user_id = %user.id, username = %user.username, "User added");
        Ok(user.to_session())
    }

    /// Admins may update anyone. Others may update only their own profile
    /// fields, never role or status.
    pub async fn update_user(&self, id: UserId, updates: UserUpdate) -> Result<SessionUser> {
        let current = self.require_session().await?;
        if !current.is_admin() {
            if current.id != id {
                return Err(CoreError::PermissionDenied(
                    "cannot modify another user".to_string(),
                ));
            }
            if updates.touches_privileges() {
                return Err(CoreError::PermissionDenied(
                    "role and status changes require admin".to_string(),
                ));
            }
        }

        let mut user = self.find_user(id).await?;
        updates.apply_to(&mut user);
        let user = self.directory.update(user).await?;

        let session = user.to_session();
        if current.id == id {
            self.set_session(session.clone()).await?;
        }
        Ok(session)
    }

    pub async fn delete_user(&self, id: UserId) -> Result<()> {
        let current = self.ensure_admin().await?;
        if current.id == id {
            return Err(CoreError::InvalidState(
                "cannot delete your own account".to_string(),
            ));
        }

        self.directory.remove(id).await?;
        info!(user_id = %id, "User deleted");
        Ok(())
    }

    pub async fn toggle_user_status(&self, id: UserId) -> Result<SessionUser> {
        self.ensure_admin().await?;

        let mut user = self.find_user(id).await?;
        user.status = user.status.toggled();
        let user = self.directory.update(user).await?;

        info!(user_id = %id, status = %user.status, "User status toggled");
        Ok(user.to_session())
    }

    async fn find_user(&self, id: UserId) -> Result<User> {
        self.directory
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("user {}", id)))
    }

    async fn require_session(&self) -> Result<SessionUser> {
        self.current_user()
            .await
            .ok_or_else(|| CoreError::PermissionDenied("not logged in".to_string()))
    }

    async fn ensure_admin(&self) -> Result<SessionUser> {
        let current = self.require_session().await?;
        if !current.is_admin() {
            return Err(CoreError::PermissionDenied("admin role required".to_string()));
        }
        Ok(current)
    }

    async fn set_session(&self, user: SessionUser) -> Result<()> {
        let raw = serde_json::to_string(&user)?;
        self.storage.save(&raw)?;
        *self.session.write().await = Some(user);
        Ok(())
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}
