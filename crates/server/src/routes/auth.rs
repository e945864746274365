//! Sign-up, sign-in and sign-out.

use axum::{Json, extract::State, http::StatusCode};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;

use fixflow_core::{Email, Profile, ValidationError};

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::models::session::ProviderToken;
use crate::services::identity::validate_password;
use crate::services::{ProfileService, ServiceError, SignUpDetails};
use crate::state::AppState;

/// Sign-up body.
#[derive(Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    #[serde(flatten)]
    pub details: SignUpDetails,
}

/// Sign-in body.
#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

fn parse_email(email: &str) -> Result<Email> {
    Email::parse(email.trim())
        .map_err(|e| AppError::Service(ServiceError::Validation(ValidationError::from(e))))
}

/// Create the identity, then the client profile.
pub async fn sign_up(
    State(state): State<AppState>,
    Json(body): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<Profile>)> {
    let email = parse_email(&body.email)?;
    ProfileService::validate_sign_up(&body.details)?;
    let password = SecretString::from(body.password);
    validate_password(&password)?;

    let user = state.identity().sign_up(&email, &password).await?;
    let profile = state.profiles().register(&user, &body.details).await?;

    Ok((StatusCode::CREATED, Json(profile)))
}

/// Sign in and remember the user in the session.
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<SignInRequest>,
) -> Result<Json<Profile>> {
    let email = parse_email(&body.email)?;
    let password = SecretString::from(body.password);
    let identity = state.identity().sign_in(&email, &password).await?;

    let profile = state
        .store()
        .get_profile(identity.user.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("No profile for this account".to_string()))?;

    let current = CurrentUser {
        id: profile.id,
        email: profile.email.clone(),
    };
    set_current_user(&session, &current, &ProviderToken::from(&identity)).await?;
    set_sentry_user(&profile.id, Some(profile.email.as_str()));

    tracing::info!(user_id = %profile.id, role = %profile.role, "Signed in");
    Ok(Json(profile))
}

/// End the session and revoke the provider token.
pub async fn sign_out(State(state): State<AppState>, session: Session) -> Result<StatusCode> {
    if let Some(token) = clear_current_user(&session).await? {
        if let Err(e) = state.identity().sign_out(&token.secret()).await {
            tracing::warn!(error = %e, "Identity provider sign-out failed");
        }
    }
    clear_sentry_user();

    Ok(StatusCode::NO_CONTENT)
}
