//! The signed-in user's own profile.

use axum::{Json, extract::State};

use fixflow_core::{Profile, ProfileUpdate};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

pub async fn show(RequireAuth(profile): RequireAuth) -> Json<Profile> {
    Json(profile)
}

/// Update name, address or phone. Role and email are not editable here.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(profile): RequireAuth,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Profile>> {
    let profile = state.profiles().update_me(profile.id, update).await?;
    Ok(Json(profile))
}
