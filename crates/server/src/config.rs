//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FIXFLOW_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `FIXFLOW_BASE_URL` - Public URL of the API
//! - `FIXFLOW_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `IDENTITY_URL` - Base URL of the hosted identity provider
//! - `IDENTITY_API_KEY` - API key sent to the identity provider
//!
//! ## Optional
//! - `FIXFLOW_HOST` - Bind address (default: 127.0.0.1)
//! - `FIXFLOW_PORT` - Listen port (default: 3000)
//! - `FIXFLOW_STORE` - `postgres` (default) or `memory`
//! - `FIXFLOW_LOG_JSON` - Emit JSON logs when set
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! With `FIXFLOW_STORE=memory` the database URL is not needed, and when the
//! identity variables are absent a local in-process identity provider is used.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

/// Session secrets shorter than this are refused.
const MIN_SECRET_LEN: usize = 32;
/// Shannon entropy floor, in bits per character.
const MIN_SECRET_ENTROPY: f64 = 3.3;

/// Fragments that mark a secret as copied from a sample `.env`.
const SAMPLE_SECRET_MARKERS: &[&str] = &[
    "changeme",
    "change-me",
    "example",
    "fixflow",
    "password",
    "placeholder",
    "replace",
    "secret",
    "your-",
    "xxx",
];

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

/// Which store implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Postgres,
    /// In-process store; data is lost on restart.
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("expected 'postgres' or 'memory', got '{other}'")),
        }
    }
}

/// FixFlow server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` connection URL (contains password). `None` only for the memory store.
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the API
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    pub store: StoreBackend,
    /// Hosted identity provider. `None` selects the local provider.
    pub identity: Option<IdentityConfig>,
    /// Emit JSON-formatted logs
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

/// Hosted identity provider configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct IdentityConfig {
    pub url: Url,
    pub api_key: SecretString,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("url", &self.url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let store: StoreBackend = env_parse("FIXFLOW_STORE", "postgres")?;
        let database_url = match store {
            StoreBackend::Postgres => Some(database_url("FIXFLOW_DATABASE_URL")?),
            StoreBackend::Memory => database_url("FIXFLOW_DATABASE_URL").ok(),
        };

        let base_url = Url::parse(&env_var("FIXFLOW_BASE_URL")?).map_err(|e| {
            ConfigError::InvalidEnvVar("FIXFLOW_BASE_URL".to_string(), e.to_string())
        })?;

        // Memory runs may still talk to a hosted provider when one is configured.
        let identity = match (store, env_opt("IDENTITY_URL")) {
            (StoreBackend::Memory, None) => None,
            _ => Some(IdentityConfig::from_env()?),
        };

        Ok(Self {
            database_url,
            host: env_parse("FIXFLOW_HOST", "127.0.0.1")?,
            port: env_parse("FIXFLOW_PORT", "3000")?,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            session_secret: session_secret("FIXFLOW_SESSION_SECRET")?,
            store,
            identity,
            log_json: env_opt("FIXFLOW_LOG_JSON").is_some(),
            sentry_dsn: env_opt("SENTRY_DSN"),
            sentry_environment: env_opt("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies must be marked `Secure`.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl IdentityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let url = Url::parse(&env_var("IDENTITY_URL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("IDENTITY_URL".to_string(), e.to_string()))?;

        Ok(Self {
            url,
            api_key: SecretString::from(env_var("IDENTITY_API_KEY")?),
        })
    }
}

// =============================================================================
// Environment
// =============================================================================

fn env_var(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn env_parse<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .as_deref()
        .unwrap_or(default)
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// `key`, else the generic `DATABASE_URL`.
fn database_url(key: &str) -> Result<SecretString, ConfigError> {
    env_opt(key)
        .or_else(|| env_opt("DATABASE_URL"))
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn session_secret(key: &str) -> Result<SecretString, ConfigError> {
    let secret = SecretString::from(env_var(key)?);
    check_secret(&secret, key)?;
    Ok(secret)
}

// =============================================================================
// Secret checks
// =============================================================================

/// Shannon entropy of `s`, in bits per character.
fn entropy_per_char(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
    }

    let total: u32 = counts.values().sum();
    if total == 0 {
        return 0.0;
    }
    let total = f64::from(total);
    counts
        .values()
        .map(|&n| {
            let p = f64::from(n) / total;
            -p * p.log2()
        })
        .sum()
}

/// Refuse short, sample, or low-entropy session secrets.
fn check_secret(secret: &SecretString, key: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    let insecure = |reason: String| ConfigError::InsecureSecret(key.to_string(), reason);

    if value.len() < MIN_SECRET_LEN {
        return Err(insecure(format!(
            "needs at least {MIN_SECRET_LEN} characters, got {}",
            value.len()
        )));
    }

    let lower = value.to_lowercase();
    if let Some(marker) = SAMPLE_SECRET_MARKERS.iter().find(|m| lower.contains(*m)) {
        return Err(insecure(format!("looks like a sample value (contains '{marker}')")));
    }

    let entropy = entropy_per_char(value);
    if entropy < MIN_SECRET_ENTROPY {
        return Err(insecure(format!(
            "{entropy:.2} bits/char is below {MIN_SECRET_ENTROPY:.1}; generate it randomly"
        )));
    }

    Ok(())
}
