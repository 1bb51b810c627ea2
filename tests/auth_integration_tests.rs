use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use chrono::Utc;
use culinary_cms::{
    AppState,
    auth::{self, AuthUser, Claims},
    config::{AppConfig, Env},
    models::{Role, User},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::time::SystemTime;
use uuid::Uuid;

const TEST_JWT_SECRET: &str = "kitchen-test-secret";

// --- Helpers ---

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Signs a token for `user_id` expiring `exp_offset` seconds from now (negative means
/// already expired).
fn create_token(user_id: Uuid, exp_offset: i64, secret: &str) -> String {
    let now = now_secs() as i64;
    let claims = Claims {
        sub: user_id,
        role: Role::Author,
        iat: now as usize,
        exp: (now + exp_offset).max(0) as usize,
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn create_app_state(env: Env) -> AppState {
    let config = AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    };
    AppState::in_memory(config)
}

async fn seed_user(state: &AppState, role: Role, is_active: bool) -> User {
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        email: format!("{}@example.com", Uuid::new_v4()),
        name: "Line Cook".to_string(),
        password_hash: "unused".to_string(),
        role,
        is_active,
        created_at: now,
        updated_at: now,
        last_login_at: None,
    };
    state.repo.save_user(&user).await.unwrap();
    user
}

/// Helper to get the mutable Parts struct from a generated Request
fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_bearer(token: &str) -> Parts {
    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    parts
}

fn with_user_header(user_id: Uuid) -> Parts {
    let mut parts = get_request_parts(Method::GET, "/me".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&user_id.to_string()).unwrap(),
    );
    parts
}

// --- Extractor ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let state = create_app_state(Env::Production);
    let user = seed_user(&state, Role::Editor, true).await;
    let token = create_token(user.id, 3600, TEST_JWT_SECRET);

    let auth_user = AuthUser::from_request_parts(&mut with_bearer(&token), &state)
        .await
        .unwrap();

    assert_eq!(auth_user.id, user.id);
    // The stored role wins over the one embedded in the token.
    assert_eq!(auth_user.role, Role::Editor);
    assert_eq!(auth_user.name, "Line Cook");
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let state = create_app_state(Env::Production);
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let err = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_non_bearer_scheme() {
    let state = create_app_state(Env::Production);
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_static("Basic Y2hlZjpzZWNyZXQ="),
    );

    let err = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    let state = create_app_state(Env::Production);
    let user = seed_user(&state, Role::Author, true).await;
    // Well past the default validation leeway.
    let token = create_token(user.id, -3600, TEST_JWT_SECRET);

    let err = AuthUser::from_request_parts(&mut with_bearer(&token), &state)
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(err.to_string(), "Session expired");
}

#[tokio::test]
async fn test_auth_failure_with_foreign_signature() {
    let state = create_app_state(Env::Production);
    let user = seed_user(&state, Role::Admin, true).await;
    let token = create_token(user.id, 3600, "some-other-secret");

    let err = AuthUser::from_request_parts(&mut with_bearer(&token), &state)
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(err.to_string(), "Invalid token");
}

#[tokio::test]
async fn test_auth_failure_for_deleted_or_inactive_account() {
    let state = create_app_state(Env::Production);

    let ghost = create_token(Uuid::new_v4(), 3600, TEST_JWT_SECRET);
    let err = AuthUser::from_request_parts(&mut with_bearer(&ghost), &state)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

    let inactive = seed_user(&state, Role::Editor, false).await;
    let token = create_token(inactive.id, 3600, TEST_JWT_SECRET);
    let err = AuthUser::from_request_parts(&mut with_bearer(&token), &state)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_local_bypass_success() {
    let state = create_app_state(Env::Local);
    let user = seed_user(&state, Role::Admin, true).await;

    let auth_user = AuthUser::from_request_parts(&mut with_user_header(user.id), &state)
        .await
        .unwrap();

    assert_eq!(auth_user.id, user.id);
    assert_eq!(auth_user.role, Role::Admin);
}

#[tokio::test]
async fn test_local_bypass_rejects_inactive_user() {
    let state = create_app_state(Env::Local);
    let user = seed_user(&state, Role::Admin, false).await;

    let err = AuthUser::from_request_parts(&mut with_user_header(user.id), &state)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let state = create_app_state(Env::Production);
    let user = seed_user(&state, Role::Admin, true).await;

    // Provide ONLY the local bypass header
    let err = AuthUser::from_request_parts(&mut with_user_header(user.id), &state)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

// --- Token and password helpers ---

#[tokio::test]
async fn test_issued_token_round_trips() {
    let state = create_app_state(Env::Production);
    let user = seed_user(&state, Role::Editor, true).await;

    let (token, expires_at) = auth::issue_token(&user, &state.config).unwrap();
    let claims = auth::decode_token(&token, TEST_JWT_SECRET).unwrap();

    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.role, Role::Editor);
    assert_eq!(claims.exp as i64, expires_at.timestamp());
    assert!(expires_at > Utc::now());
}

#[test]
fn test_require_checks_role_capability() {
    let author = AuthUser {
        id: Uuid::new_v4(),
        name: "A".to_string(),
        role: Role::Author,
    };
    let editor = AuthUser {
        role: Role::Editor,
        ..author.clone()
    };

    let err = author.require(|role| role.can_moderate()).unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
    assert!(editor.require(|role| role.can_moderate()).is_ok());
    assert!(editor.require(|role| role.can_manage_users()).is_err());
}

#[tokio::test]
async fn test_password_hash_and_verify() {
    let hash = auth::hash_password("saffron-risotto", 4).await.unwrap();

    assert_ne!(hash, "saffron-risotto");
    assert!(auth::verify_password("saffron-risotto", &hash).await.unwrap());
    assert!(!auth::verify_password("plain-risotto", &hash).await.unwrap());
    // A corrupted hash is a mismatch, not a server error.
    assert!(!auth::verify_password("saffron-risotto", "not-a-hash").await.unwrap());
}

#[tokio::test]
async fn test_decoy_hash_is_a_stable_bcrypt_hash() {
    let first = auth::decoy_hash(4).await.unwrap();
    let second = auth::decoy_hash(12).await.unwrap();

    // Computed once; later callers reuse it.
    assert_eq!(first, second);
    assert!(first.starts_with("$2"));
    assert!(!auth::verify_password("mise-en-place", first).await.unwrap());
}

#[test]
fn test_password_and_email_validation() {
    assert!(auth::validate_password("short").is_err());
    assert!(auth::validate_password("long-enough").is_ok());

    assert_eq!(
        auth::normalize_email("  Chef@Example.COM ").unwrap(),
        "chef@example.com"
    );
    for invalid in ["", "chef", "@example.com", "chef@example", "chef@.com", "ch ef@example.com"] {
        assert!(auth::normalize_email(invalid).is_err(), "{invalid} should be rejected");
    }
}

#[tokio::test]
async fn test_bootstrap_admin_created_once() {
    let config = AppConfig {
        admin_email: Some("Owner@Example.com".to_string()),
        admin_password: Some("first-service".to_string()),
        ..AppConfig::default()
    };
    let state = AppState::in_memory(config);

    let admin = auth::ensure_admin_account(&state.repo, &state.config)
        .await
        .unwrap()
        .expect("admin should be created on an empty store");
    assert_eq!(admin.email, "owner@example.com");
    assert_eq!(admin.role, Role::Admin);
    assert!(auth::verify_password("first-service", &admin.password_hash).await.unwrap());

    let again = auth::ensure_admin_account(&state.repo, &state.config)
        .await
        .unwrap();
    assert!(again.is_none());
    assert_eq!(state.repo.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_bootstrap_admin_skipped_without_credentials() {
    let state = create_app_state(Env::Local);
    let created = auth::ensure_admin_account(&state.repo, &state.config)
        .await
        .unwrap();
    assert!(created.is_none());
}
