//! Gateway configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `GATEWAY_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `GATEWAY_BASE_URL` - Public URL the gateway is served from
//! - `GATEWAY_SESSION_SECRET` - Session secret (min 32 chars, not a placeholder)
//! - `AUTH_PROVIDER_URL` - Token verification endpoint of the external auth provider
//! - `AUTH_PROVIDER_API_KEY` - API key sent with token exchanges
//! - `PREDICT_API_URL` - Base URL of the upstream prediction API
//!
//! ## Optional
//! - `GATEWAY_HOST` - Bind address (default: 127.0.0.1)
//! - `GATEWAY_PORT` - Listen port (default: 3000)
//! - `ALLOWED_ORIGINS` - Comma-separated referrer origins accepted at verification
//!   (default: the base URL)
//! - `TRUSTED_SOURCE_TAG` - Source tag accepted as alternate proof of referral
//!   (default: `nextstep`)
//! - `DAILY_USAGE_LIMIT` - Gated generations per user per UTC day (default: 5)
//! - `UNLIMITED_EMAILS` - Comma-separated emails exempt from the daily limit
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use nextstep_core::Email;

const MIN_SESSION_SECRET_LENGTH: usize = 32;

/// Blocklist of common placeholder patterns (case-insensitive).
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
];

/// Default daily generation limit per user.
const DEFAULT_DAILY_LIMIT: u32 = 5;

/// Bound on the auth provider token exchange and the post-auth warm-up.
const INIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Gateway application configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// `PostgreSQL` connection URL (contains password).
    pub database_url: SecretString,
    /// IP address to bind the server to.
    pub host: IpAddr,
    /// Port to listen on.
    pub port: u16,
    /// Public base URL of the gateway.
    pub base_url: String,
    /// Session secret.
    pub session_secret: SecretString,
    /// Authorization gate configuration.
    pub auth: AuthConfig,
    /// Usage gate configuration.
    pub usage: UsageConfig,
    /// Base URL of the upstream prediction API.
    pub predict_api_url: String,
    /// Sentry DSN for error tracking.
    pub sentry_dsn: Option<String>,
}

/// Auth provider and referral-proof configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// Token verification endpoint of the external auth provider.
    pub provider_url: String,
    /// API key sent with token exchanges.
    pub provider_api_key: SecretString,
    /// Referrer origins accepted at verification.
    pub allowed_origins: Vec<String>,
    /// Source tag accepted as alternate proof of referral.
    pub trusted_source_tag: String,
    /// Bound on the token exchange and post-auth initialization.
    pub init_timeout: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("provider_url", &self.provider_url)
            .field("provider_api_key", &"[REDACTED]")
            .field("allowed_origins", &self.allowed_origins)
            .field("trusted_source_tag", &self.trusted_source_tag)
            .field("init_timeout", &self.init_timeout)
            .finish()
    }
}

/// Daily quota configuration.
#[derive(Debug, Clone)]
pub struct UsageConfig {
    /// Gated generations allowed per user per UTC day.
    pub daily_limit: u32,
    /// Emails exempt from the daily limit.
    pub unlimited_emails: Vec<Email>,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the session secret fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("GATEWAY_DATABASE_URL")?;
        let host = get_env_or_default("GATEWAY_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("GATEWAY_HOST".to_owned(), e.to_string()))?;
        let port = get_env_or_default("GATEWAY_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("GATEWAY_PORT".to_owned(), e.to_string()))?;
        let base_url = get_required_env("GATEWAY_BASE_URL")?;
        let session_secret = get_required_secret("GATEWAY_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "GATEWAY_SESSION_SECRET")?;

        let auth = AuthConfig::from_env(&base_url)?;
        let usage = UsageConfig::from_env()?;
        let predict_api_url = get_required_env("PREDICT_API_URL")?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            auth,
            usage,
            predict_api_url,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl AuthConfig {
    fn from_env(base_url: &str) -> Result<Self, ConfigError> {
        let allowed_origins = match get_optional_env("ALLOWED_ORIGINS") {
            Some(raw) => parse_list(&raw),
            None => vec![base_url.trim_end_matches('/').to_owned()],
        };

        Ok(Self {
            provider_url: get_required_env("AUTH_PROVIDER_URL")?,
            provider_api_key: get_required_secret("AUTH_PROVIDER_API_KEY")?,
            allowed_origins,
            trusted_source_tag: get_env_or_default("TRUSTED_SOURCE_TAG", "nextstep"),
            init_timeout: INIT_TIMEOUT,
        })
    }
}

impl UsageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let daily_limit = get_env_or_default("DAILY_USAGE_LIMIT", "5")
            .parse::<u32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("DAILY_USAGE_LIMIT".to_owned(), e.to_string())
            })?;
        if daily_limit == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "DAILY_USAGE_LIMIT".to_owned(),
                "must be at least 1".to_owned(),
            ));
        }

        let unlimited_emails = match get_optional_env("UNLIMITED_EMAILS") {
            Some(raw) => parse_list(&raw)
                .iter()
                .map(|s| {
                    Email::parse(s).map_err(|e| {
                        ConfigError::InvalidEnvVar("UNLIMITED_EMAILS".to_owned(), e.to_string())
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            daily_limit,
            unlimited_emails,
        })
    }
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            daily_limit: DEFAULT_DAILY_LIMIT,
            unlimited_emails: Vec::new(),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_owned()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_owned()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Split a comma-separated env value, dropping empty entries.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Validate that the session secret is long enough and not a placeholder.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_owned(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }

    let lower = value.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_owned(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_trims_and_drops_empties() {
        let parsed = parse_list("https://a.example, https://b.example ,,");
        assert_eq!(parsed, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_validate_session_secret_placeholder() {
        let secret = SecretString::from("your-session-secret-value-goes-here-1234");
        let err = validate_session_secret(&secret, "TEST_SESSION").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_session_secret_valid() {
        let secret = SecretString::from("aB3xY9mK2nL5pQ7rT0uW4zC6dE8fG1hJ");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = GatewayConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_owned(),
            session_secret: SecretString::from("x".repeat(32)),
            auth: AuthConfig {
                provider_url: "https://auth.test/verify".to_owned(),
                provider_api_key: SecretString::from("k"),
                allowed_origins: vec!["http://localhost:3000".to_owned()],
                trusted_source_tag: "nextstep".to_owned(),
                init_timeout: INIT_TIMEOUT,
            },
            usage: UsageConfig::default(),
            predict_api_url: "http://localhost:8000".to_owned(),
            sentry_dsn: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_auth_config_debug_redacts_api_key() {
        let config = AuthConfig {
            provider_url: "https://auth.test/verify".to_owned(),
            provider_api_key: SecretString::from("super_secret_api_key"),
            allowed_origins: vec!["https://nextstep.example".to_owned()],
            trusted_source_tag: "nextstep".to_owned(),
            init_timeout: INIT_TIMEOUT,
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("https://auth.test/verify"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_api_key"));
    }

    #[test]
    fn test_default_usage_config() {
        let usage = UsageConfig::default();
        assert_eq!(usage.daily_limit, 5);
        assert!(usage.unlimited_emails.is_empty());
    }
}
