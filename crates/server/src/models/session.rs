//! Session-stored identity.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use fixflow_core::{Email, UserId};

use crate::services::IdentitySession;

/// Minimal data stored in the session to identify the signed-in user.
///
/// Role and profile fields are deliberately absent: they are re-read from the
/// profile store on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
}

/// Identity provider access token, kept so sign-out can revoke it.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderToken(String);

impl ProviderToken {
    #[must_use]
    pub fn secret(&self) -> SecretString {
        SecretString::from(self.0.clone())
    }
}

impl std::fmt::Debug for ProviderToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ProviderToken([REDACTED])")
    }
}

impl From<&IdentitySession> for ProviderToken {
    fn from(session: &IdentitySession) -> Self {
        Self(session.access_token.expose_secret().to_owned())
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// The signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// The identity provider's access token.
    pub const PROVIDER_TOKEN: &str = "provider_token";
}
