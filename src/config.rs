use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded and pulled
/// into handlers and extractors through `FromRef`, like the repository.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls the in-memory fallback and the `x-user-id` bypass.
    pub env: Env,
    // TCP port the HTTP server binds to on 0.0.0.0.
    pub port: u16,
    // Realtime Database root, e.g. https://my-project-default-rtdb.firebaseio.com.
    // `None` is only accepted locally and selects the in-memory store.
    pub firebase_url: Option<String>,
    // Database secret or ID token appended as `?auth=` to every REST call.
    pub firebase_auth: Option<String>,
    // HMAC secret used to sign and verify session tokens.
    pub jwt_secret: String,
    // Lifetime of an issued session token.
    pub token_ttl_hours: i64,
    // bcrypt work factor for new password hashes.
    pub bcrypt_cost: u32,
    // Bootstrap account created when the user collection is empty.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub admin_name: String,
}

/// Env
///
/// Defines the runtime context: local development (in-memory store, header bypass)
/// or production (Firebase required, tokens only).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const LOCAL_JWT_SECRET: &str = "culinary-cms-local-development-secret";

impl Default for AppConfig {
    /// Non-panicking configuration for tests: in-memory store, cheap bcrypt cost.
    fn default() -> Self {
        Self {
            env: Env::Local,
            port: 3000,
            firebase_url: None,
            firebase_auth: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            token_ttl_hours: 24,
            bcrypt_cost: 4,
            admin_email: None,
            admin_password: None,
            admin_name: "Administrator".to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from environment variables and fails fast.
    ///
    /// # Panics
    /// Panics in production when `FIREBASE_DATABASE_URL` or `JWT_SECRET` is missing, and in
    /// any environment when a numeric variable cannot be parsed.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let (firebase_url, jwt_secret) = match env {
            Env::Production => (
                Some(
                    env::var("FIREBASE_DATABASE_URL")
                        .expect("FATAL: FIREBASE_DATABASE_URL must be set in production."),
                ),
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production."),
            ),
            Env::Local => (
                non_empty("FIREBASE_DATABASE_URL"),
                env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
            ),
        };

        Self {
            env,
            port: parse_or("PORT", 3000),
            firebase_url: firebase_url.map(|url| url.trim_end_matches('/').to_string()),
            firebase_auth: non_empty("FIREBASE_AUTH_TOKEN"),
            jwt_secret,
            token_ttl_hours: parse_or("JWT_TTL_HOURS", 24),
            bcrypt_cost: parse_or("BCRYPT_COST", bcrypt::DEFAULT_COST),
            admin_email: non_empty("ADMIN_EMAIL"),
            admin_password: non_empty("ADMIN_PASSWORD"),
            admin_name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string()),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("FATAL: {key} has an invalid value: {raw}")),
        Err(_) => default,
    }
}
