use pretty_assertions::assert_eq;
use rstest::rstest;
use stock_dashboard_core::*;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

type Store = AuthStore<InMemoryUserDirectory, MemorySessionStorage>;

fn store() -> Store {
    AuthStore::new(InMemoryUserDirectory::seeded(), MemorySessionStorage::new())
}

async fn admin_store() -> Store {
    let store = store();
    store
        .login(LoginRequest::new("admin", "admin123"))
        .await
        .unwrap();
    store
}

// ===== Login =====

#[rstest]
#[case("admin", "admin123")]
#[case("admin@example.com", "admin123")]
#[case("user1", "user123")]
#[tokio::test]
async fn test_login_succeeds(#[case] login: &str, #[case] password: &str) {
    let store = store();
    let user = store.login(LoginRequest::new(login, password)).await.unwrap();

    assert!(store.is_logged_in().await);
    assert_eq!(store.current_user().await, Some(user.clone()));

    let persisted = store.storage().peek().unwrap();
    let restored: SessionUser = serde_json::from_str(&persisted).unwrap();
    assert_eq!(restored, user);
    assert!(!persisted.contains("password"));
}

#[tokio::test]
async fn test_login_wrong_password() {
    let store = store();
    let err = store
        .login(LoginRequest::new("admin", "nope"))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::InvalidCredentials));
    assert!(!store.is_logged_in().await);
    assert_eq!(store.storage().peek(), None);
}

#[tokio::test]
async fn test_login_inactive_account() {
    let store = store();
    let err = store
        .login(LoginRequest::new("user2", "user123"))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::AccountDisabled));
    assert!(!store.is_logged_in().await);
}

// ===== Register =====

#[tokio::test]
async fn test_register_auto_login() {
    let store = store();
    let user = store
        .register(RegisterRequest::new("dave", "dave@example.com", "pw").with_name("Dave"))
        .await
        .unwrap();

    assert_eq!(user.id, UserId(4));
    assert_eq!(user.role, Role::User);
    assert_eq!(user.status, UserStatus::Active);
    assert!(user.avatar.contains("name=Dave"));
    assert_eq!(store.current_user().await.map(|u| u.id), Some(UserId(4)));

    // the new account can log in again
    assert_ok!(store.logout().await);
    assert_ok!(store.login(LoginRequest::new("dave", "pw")).await);
    assert_err!(store.login(LoginRequest::new("dave", "wrong")).await);
}

#[rstest]
#[case("admin", "fresh@example.com")]
#[case("fresh", "user1@example.com")]
#[tokio::test]
async fn test_register_duplicate_leaves_directory_untouched(
    #[case] username: &str,
    #[case] email: &str,
) {
    let store = store();
    let err = store
        .register(RegisterRequest::new(username, email, "pw"))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::AlreadyExists(_)));
    assert_eq!(store.directory().list().await.unwrap().len(), 3);
    assert!(!store.is_logged_in().await);
}

#[tokio::test]
async fn test_register_rejects_invalid_email() {
    let err = store()
        .register(RegisterRequest::new("x", "not-an-email", "pw"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

// ===== Session lifecycle =====

#[tokio::test]
async fn test_logout_clears_everything() {
    let store = admin_store().await;
    let target = store.logout().await.unwrap();

    assert_eq!(target, "/auth/login");
    assert!(!store.is_logged_in().await);
    assert_eq!(store.storage().peek(), None);
}

#[tokio::test]
async fn test_initialize_restores_from_file() {
    let dir = TempDir::new().unwrap();

    let first = AuthStore::new(
        InMemoryUserDirectory::seeded(),
        FileSessionStorage::new(dir.path()),
    );
    first
        .login(LoginRequest::new("user1", "user123"))
        .await
        .unwrap();

    let second = AuthStore::new(
        InMemoryUserDirectory::seeded(),
        FileSessionStorage::new(dir.path()),
    );
    let restored = second.initialize().await.unwrap().unwrap();

    assert_eq!(restored.username, "user1");
    assert!(!second.is_admin().await);
}

#[tokio::test]
async fn test_initialize_discards_corrupt_data() {
    let store = AuthStore::new(
        InMemoryUserDirectory::seeded(),
        MemorySessionStorage::with_value("{\"id\": \"oops\""),
    );

    assert_eq!(store.initialize().await.unwrap(), None);
    assert_eq!(store.storage().peek(), None);
}

#[tokio::test]
async fn test_route_guards() {
    let store = store();
    assert_eq!(
        store.require_auth().await.unwrap(),
        GuardOutcome::Redirect("/auth/login")
    );
    assert_eq!(store.require_guest().await.unwrap(), GuardOutcome::Proceed);

    store
        .login(LoginRequest::new("user1", "user123"))
        .await
        .unwrap();
    assert_eq!(store.require_auth().await.unwrap(), GuardOutcome::Proceed);
    assert_eq!(
        store.require_guest().await.unwrap(),
        GuardOutcome::Redirect("/")
    );
}

// ===== User management =====

#[tokio::test]
async fn test_admin_lists_users_without_passwords() {
    let store = admin_store().await;
    let users = store.all_users().await.unwrap();

    assert_eq!(users.len(), 3);
    let json = serde_json::to_string(&users).unwrap();
    assert!(!json.contains("admin123"));
}

#[tokio::test]
async fn test_non_admin_is_denied() {
    let store = store();
    store
        .login(LoginRequest::new("user1", "user123"))
        .await
        .unwrap();

    assert!(matches!(
        store.all_users().await,
        Err(CoreError::PermissionDenied(_))
    ));
    assert!(matches!(
        store.toggle_user_status(UserId(3)).await,
        Err(CoreError::PermissionDenied(_))
    ));
    assert!(matches!(
        store.delete_user(UserId(3)).await,
        Err(CoreError::PermissionDenied(_))
    ));
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let store = admin_store().await;
    assert!(matches!(
        store.delete_user(UserId(1)).await,
        Err(CoreError::InvalidState(_))
    ));
    assert!(store.delete_user(UserId(3)).await.is_ok());
    assert_eq!(store.all_users().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_toggle_user_status_enables_login() {
    let store = admin_store().await;
    let toggled = store.toggle_user_status(UserId(3)).await.unwrap();
    assert_eq!(toggled.status, UserStatus::Active);

    store.logout().await.unwrap();
    assert!(store
        .login(LoginRequest::new("user2", "user123"))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_add_user_defaults() {
    let store = admin_store().await;
    let added = store
        .add_user(NewUser::new("eve", "eve@example.com", "Eve"))
        .await
        .unwrap();
    assert_eq!(added.id, UserId(4));

    let err = store
        .add_user(NewUser::new("eve", "other@example.com", "Eve"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("username"));

    let err = store
        .add_user(NewUser::new("eve2", "eve@example.com", "Eve"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("email"));

    store.logout().await.unwrap();
    assert!(store
        .login(LoginRequest::new("eve", DEFAULT_PASSWORD))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_self_update_refreshes_session() {
    let store = store();
    store
        .login(LoginRequest::new("user1", "user123"))
        .await
        .unwrap();

    let updated = store
        .update_user(UserId(2), UserUpdate::new().with_name("Renamed"))
        .await
        .unwrap();

    assert_eq!(updated.name, "Renamed");
    assert_eq!(store.current_user().await.unwrap().name, "Renamed");
    assert!(store.storage().peek().unwrap().contains("Renamed"));
}

#[tokio::test]
async fn test_self_update_cannot_escalate() {
    let store = store();
    store
        .login(LoginRequest::new("user1", "user123"))
        .await
        .unwrap();

    assert!(matches!(
        store
            .update_user(UserId(2), UserUpdate::new().with_role(Role::Admin))
            .await,
        Err(CoreError::PermissionDenied(_))
    ));
    assert!(matches!(
        store
            .update_user(UserId(1), UserUpdate::new().with_name("x"))
            .await,
        Err(CoreError::PermissionDenied(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_simulated_latency() {
    let store = store().with_latency(std::time::Duration::from_secs(1));
    let started = tokio::time::Instant::now();
    store
        .login(LoginRequest::new("admin", "admin123"))
        .await
        .unwrap();
    assert!(started.elapsed() >= std::time::Duration::from_secs(1));
}
