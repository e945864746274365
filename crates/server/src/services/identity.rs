//! Identity provider clients.
//!
//! Account credentials never touch the FixFlow database: sign-up and sign-in
//! are delegated to a hosted identity provider speaking the GoTrue REST
//! dialect. [`LocalIdentityProvider`] is an in-process stand-in for local
//! runs with the memory store and for tests.

use std::collections::HashMap;
use std::time::Duration;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;
use url::Url;
use uuid::Uuid;

use fixflow_core::{Email, EmailError, UserId};

use crate::config::IdentityConfig;

/// Minimum password length accepted before calling the provider.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// HTTP timeout for identity provider calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Errors that can occur when talking to the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("user already registered")]
    AlreadyRegistered,

    /// Password rejected by policy.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with something we don't understand.
    #[error("identity provider error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("password hashing error")]
    PasswordHash,
}

/// A user as known to the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityUser {
    pub id: UserId,
    pub email: Email,
}

/// A signed-in user and the provider's access token.
#[derive(Debug, Clone)]
pub struct IdentitySession {
    pub user: IdentityUser,
    pub access_token: SecretString,
}

/// Hosted authentication: account creation, sign-in and sign-out.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account.
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<IdentityUser, IdentityError>;

    /// Exchange credentials for a session.
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<IdentitySession, IdentityError>;

    /// Revoke a session's access token.
    async fn sign_out(&self, access_token: &SecretString) -> Result<(), IdentityError>;
}

/// Reject passwords that are obviously too weak.
///
/// # Errors
///
/// Returns `IdentityError::WeakPassword` for short passwords.
pub fn validate_password(password: &SecretString) -> Result<(), IdentityError> {
    if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
        return Err(IdentityError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

// =============================================================================
// Hosted provider
// =============================================================================

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: Uuid,
    email: String,
}

impl TryFrom<ApiUser> for IdentityUser {
    type Error = IdentityError;

    fn try_from(user: ApiUser) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::new(user.id),
            email: Email::parse(&user.email)?,
        })
    }
}

/// Sign-up answers with a bare user, or with a session when auto-confirm is on.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session { user: ApiUser },
    User(ApiUser),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: ApiUser,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default, alias = "error_code")]
    code: Option<serde_json::Value>,
    #[serde(default, alias = "error_description", alias = "message")]
    msg: Option<String>,
}

/// Client for a GoTrue-compatible hosted identity provider.
#[derive(Clone)]
pub struct HostedIdentityProvider {
    client: reqwest::Client,
    base_url: Url,
}

impl HostedIdentityProvider {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(config.api_key.expose_secret()).map_err(|e| {
                IdentityError::Api {
                    status: 0,
                    message: format!("invalid API key format: {e}"),
                }
            })?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    async fn api_error(response: reqwest::Response) -> IdentityError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let code = body
            .code
            .as_ref()
            .map(|c| c.as_str().map_or_else(|| c.to_string(), str::to_owned))
            .unwrap_or_default();
        let message = body.msg.unwrap_or(text);

        if code == "user_already_exists"
            || code == "email_exists"
            || message.contains("already registered")
        {
            return IdentityError::AlreadyRegistered;
        }
        if code == "weak_password" {
            return IdentityError::WeakPassword(message);
        }
        if code == "invalid_credentials"
            || message.contains("Invalid login credentials")
            || status == StatusCode::UNAUTHORIZED
        {
            return IdentityError::InvalidCredentials;
        }

        IdentityError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl IdentityProvider for HostedIdentityProvider {
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<IdentityUser, IdentityError> {
        let body = serde_json::json!({
            "email": email.as_str(),
            "password": password.expose_secret(),
        });

        let response = self
            .client
            .post(self.endpoint("/auth/v1/signup"))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        match response.json::<SignUpResponse>().await? {
            SignUpResponse::Session { user } | SignUpResponse::User(user) => user.try_into(),
        }
    }

    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<IdentitySession, IdentityError> {
        let body = serde_json::json!({
            "email": email.as_str(),
            "password": password.expose_secret(),
        });

        let response = self
            .client
            .post(self.endpoint("/auth/v1/token?grant_type=password"))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let token: TokenResponse = response.json().await?;
        Ok(IdentitySession {
            user: token.user.try_into()?,
            access_token: SecretString::from(token.access_token),
        })
    }

    async fn sign_out(&self, access_token: &SecretString) -> Result<(), IdentityError> {
        let response = self
            .client
            .post(self.endpoint("/auth/v1/logout"))
            .bearer_auth(access_token.expose_secret())
            .send()
            .await?;

        // An already-expired token is as good as signed out.
        if response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        Err(Self::api_error(response).await)
    }
}

// =============================================================================
// Local provider
// =============================================================================

#[derive(Debug)]
struct LocalAccount {
    id: UserId,
    email: Email,
    password_hash: String,
}

/// In-process identity provider with Argon2-hashed passwords.
#[derive(Debug, Default)]
pub struct LocalIdentityProvider {
    accounts: RwLock<HashMap<String, LocalAccount>>,
}

impl LocalIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(email: &Email) -> String {
        email.as_str().to_lowercase()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<IdentityUser, IdentityError> {
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let mut accounts = self.accounts.write().await;
        let key = Self::key(email);
        if accounts.contains_key(&key) {
            return Err(IdentityError::AlreadyRegistered);
        }

        let account = LocalAccount {
            id: UserId::random(),
            email: email.clone(),
            password_hash,
        };
        let user = IdentityUser {
            id: account.id,
            email: account.email.clone(),
        };
        accounts.insert(key, account);
        Ok(user)
    }

    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<IdentitySession, IdentityError> {
        let accounts = self.accounts.read().await;
        let account = accounts
            .get(&Self::key(email))
            .ok_or(IdentityError::InvalidCredentials)?;
        verify_password(password, &account.password_hash)?;

        Ok(IdentitySession {
            user: IdentityUser {
                id: account.id,
                email: account.email.clone(),
            },
            access_token: SecretString::from(Uuid::new_v4().to_string()),
        })
    }

    async fn sign_out(&self, _access_token: &SecretString) -> Result<(), IdentityError> {
        Ok(())
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &SecretString) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| IdentityError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &SecretString, hash: &str) -> Result<(), IdentityError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| IdentityError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.expose_secret().as_bytes(), &parsed_hash)
        .map_err(|_| IdentityError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_local_sign_up_then_sign_in() {
        let provider = LocalIdentityProvider::new();
        let password = SecretString::from("correct horse battery");

        let user = provider
            .sign_up(&email("carla@fixflow.test"), &password)
            .await
            .unwrap();
        let session = provider
            .sign_in(&email("carla@fixflow.test"), &password)
            .await
            .unwrap();

        assert_eq!(session.user, user);
    }

    #[tokio::test]
    async fn test_local_rejects_wrong_password_and_duplicates() {
        let provider = LocalIdentityProvider::new();
        let password = SecretString::from("correct horse battery");
        provider
            .sign_up(&email("carla@fixflow.test"), &password)
            .await
            .unwrap();

        assert!(matches!(
            provider
                .sign_in(&email("carla@fixflow.test"), &SecretString::from("wrong password"))
                .await,
            Err(IdentityError::InvalidCredentials)
        ));
        assert!(matches!(
            provider.sign_up(&email("carla@fixflow.test"), &password).await,
            Err(IdentityError::AlreadyRegistered)
        ));
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            validate_password(&SecretString::from("short")),
            Err(IdentityError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_sign_up_response_shapes() {
        let bare = r#"{"id":"6f1c1c1e-9a3b-4c7d-8e2f-0a1b2c3d4e5f","email":"a@b.co"}"#;
        let session = r#"{"access_token":"t","user":{"id":"6f1c1c1e-9a3b-4c7d-8e2f-0a1b2c3d4e5f","email":"a@b.co"}}"#;

        for body in [bare, session] {
            let parsed: SignUpResponse = serde_json::from_str(body).unwrap();
            let (SignUpResponse::Session { user } | SignUpResponse::User(user)) = parsed;
            assert_eq!(user.email, "a@b.co");
        }
    }
}
