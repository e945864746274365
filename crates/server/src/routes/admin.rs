//! User administration.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use fixflow_core::{Profile, Role, UserId};

use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RosterQuery {
    #[serde(default = "default_role")]
    pub role: Role,
}

const fn default_role() -> Role {
    Role::Client
}

pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<RosterQuery>,
) -> Result<Json<Vec<Profile>>> {
    let users = state.profiles().list_users(&admin, query.role).await?;
    Ok(Json(users))
}

/// Promote a client to collaborator.
pub async fn promote(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<Profile>> {
    let profile = state.profiles().promote(&admin, id).await?;

    let user_id = id.to_string();
    add_breadcrumb(
        "admin",
        "User promoted",
        Some(&[("user_id", user_id.as_str())]),
    );
    Ok(Json(profile))
}

/// Delete a profile. The identity-provider account is left alone.
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<StatusCode> {
    state.profiles().delete_user(&admin, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
