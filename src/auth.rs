use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{AppError, AppResult},
    models::{Role, User},
    repository::RepositoryState,
};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Claims
///
/// Payload of the session tokens issued by `POST /auth/login`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the id of the user the token was issued to.
    pub sub: Uuid,
    /// Role at issue time. Informational only; checks use the stored role.
    pub role: Role,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// AuthUser
///
/// Resolved identity of an authenticated request, loaded fresh from the store on every
/// request so role changes and deactivations apply immediately.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

impl AuthUser {
    /// Fails with 403 unless `allowed` holds for the caller's role.
    pub fn require(&self, allowed: impl Fn(&Role) -> bool) -> AppResult<()> {
        if allowed(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Insufficient role"))
        }
    }
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            role: user.role,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument, so authentication stays out of the
/// handlers and only the role checks remain there.
///
/// The process:
/// 1. Dependency Resolution: the repository and `AppConfig` come from the app state.
/// 2. Local Bypass: in `Env::Local` an `x-user-id` header naming an existing active user
///    authenticates the request.
/// 3. Token Validation: Bearer extraction, then signature and expiry checks.
/// 4. Store Lookup: the current record is loaded, so deleted or deactivated accounts
///    lose access even with a token that has not expired.
///
/// Rejection: 401 with a JSON error body.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    // Repository for the user lookup.
    RepositoryState: FromRef<S>,
    // JWT secret and environment.
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // 1. Dependency Resolution
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // 2. Local Development Bypass
        // A bad header or unknown id falls through to the token flow.
        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| Uuid::parse_str(value).ok());
            if let Some(user_id) = bypass_id {
                if let Some(user) = repo.get_user(user_id).await? {
                    if user.is_active {
                        return Ok(AuthUser::from(&user));
                    }
                }
            }
        }

        // 3. Token Extraction and Validation
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized("Missing bearer token"))?;

        let claims = decode_token(token, &config.jwt_secret)?;

        // 4. Store Lookup
        // The role comes from the stored record, never from the token.
        let user = repo
            .get_user(claims.sub)
            .await?
            .filter(|user| user.is_active)
            .ok_or(AppError::Unauthorized("Unknown or inactive account"))?;

        Ok(AuthUser::from(&user))
    }
}

/// issue_token
///
/// Signs an HS256 session token for `user`, valid for `config.token_ttl_hours`.
pub fn issue_token(user: &User, config: &AppConfig) -> AppResult<(String, DateTime<Utc>)> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(config.token_ttl_hours);
    let claims = Claims {
        sub: user.id,
        role: user.role,
        exp: expires_at.timestamp().max(0) as usize,
        iat: now.timestamp().max(0) as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))?;

    Ok((token, expires_at))
}

/// decode_token
///
/// Validates signature and expiry. Any failure maps to 401.
pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::Unauthorized("Session expired"),
            _ => AppError::Unauthorized("Invalid token"),
        })
}

/// hash_password
///
/// bcrypt is deliberately slow, so hashing runs on the blocking pool.
pub async fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
        .map_err(|e| AppError::Internal(format!("hashing failed: {e}")))
}

/// verify_password
///
/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))?;

    Ok(verified.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "stored password hash could not be parsed");
        false
    }))
}

static DECOY_HASH: OnceCell<String> = OnceCell::const_new();

/// decoy_hash
///
/// A bcrypt hash of a throwaway secret, computed once at the cost of the first caller.
/// Logins for unknown emails verify against it so they take as long as a wrong password.
pub async fn decoy_hash(cost: u32) -> AppResult<&'static str> {
    DECOY_HASH
        .get_or_try_init(|| hash_password("no-such-account", cost))
        .await
        .map(String::as_str)
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Lowercases and sanity-checks an email address.
pub fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(email)
    } else {
        Err(AppError::Validation("Invalid email address".to_string()))
    }
}

/// ensure_admin_account
///
/// Creates the bootstrap admin from `ADMIN_EMAIL`/`ADMIN_PASSWORD` when the user
/// collection is empty. Returns the created account, if any.
pub async fn ensure_admin_account(
    repo: &RepositoryState,
    config: &AppConfig,
) -> AppResult<Option<User>> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(None);
    };

    if !repo.list_users().await?.is_empty() {
        return Ok(None);
    }

    let email = normalize_email(email)?;
    validate_password(password)?;

    let now = Utc::now();
    let admin = User {
        id: Uuid::new_v4(),
        email,
        name: config.admin_name.clone(),
        password_hash: hash_password(password, config.bcrypt_cost).await?,
        role: Role::Admin,
        is_active: true,
        created_at: now,
        updated_at: now,
        last_login_at: None,
    };
    repo.save_user(&admin).await?;

    tracing::info!(email = %admin.email, "bootstrap admin account created");
    Ok(Some(admin))
}
