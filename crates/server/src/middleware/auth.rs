//! Authentication extractors.
//!
//! The session only remembers who signed in. The profile, and with it the
//! role, is re-read from the store on every request so promotions and
//! deletions take effect immediately.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use fixflow_core::{LifecycleError, Profile, Role};

use crate::error::{AppError, set_sentry_user};
use crate::models::{CurrentUser, session_keys, session::ProviderToken};
use crate::state::AppState;

/// Extractor that requires a signed-in user with a profile.
///
/// ```rust,ignore
/// async fn handler(RequireAuth(profile): RequireAuth) -> Json<Profile> {
///     Json(profile)
/// }
/// ```
pub struct RequireAuth(pub Profile);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let user: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Sign in required".to_string()))?;

        let profile = state
            .store()
            .get_profile(user.id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Profile no longer exists".to_string()))?;

        set_sentry_user(&profile.id, Some(profile.email.as_str()));
        Ok(Self(profile))
    }
}

/// Extractor that requires a signed-in administrator.
pub struct RequireAdmin(pub Profile);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(profile) = RequireAuth::from_request_parts(parts, state).await?;
        if profile.role != Role::Admin {
            return Err(LifecycleError::Forbidden("administrators only").into());
        }
        Ok(Self(profile))
    }
}

/// Record the signed-in user in the session.
///
/// The session ID is cycled first so a pre-login ID cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
    token: &ProviderToken,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await?;
    session.insert(session_keys::PROVIDER_TOKEN, token).await
}

/// Tear down the session (sign-out), returning the provider token if any.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(
    session: &Session,
) -> Result<Option<ProviderToken>, tower_sessions::session::Error> {
    let token = session
        .remove::<ProviderToken>(session_keys::PROVIDER_TOKEN)
        .await?;
    session.flush().await?;
    Ok(token)
}
