//! Request threads and direct messages.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use fixflow_core::{ChatMessage, RequestId, UserId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Outgoing message body.
#[derive(Debug, Deserialize)]
pub struct SendMessage {
    pub message: String,
}

/// Who to open a direct chat with.
#[derive(Debug, Serialize)]
pub struct AdminContact {
    pub id: UserId,
    pub name: String,
}

pub async fn request_thread(
    State(state): State<AppState>,
    RequireAuth(profile): RequireAuth,
    Path(id): Path<RequestId>,
) -> Result<Json<Vec<ChatMessage>>> {
    let thread = state.messaging().request_thread(&profile, id).await?;
    Ok(Json(thread))
}

/// Post to a request thread; returns the stored message.
pub async fn send_to_request(
    State(state): State<AppState>,
    RequireAuth(profile): RequireAuth,
    Path(id): Path<RequestId>,
    Json(body): Json<SendMessage>,
) -> Result<(StatusCode, Json<ChatMessage>)> {
    let message = state
        .messaging()
        .send_request_message(&profile, id, &body.message)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn direct_thread(
    State(state): State<AppState>,
    RequireAuth(profile): RequireAuth,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<ChatMessage>>> {
    let thread = state.messaging().direct_thread(&profile, user_id).await?;
    Ok(Json(thread))
}

pub async fn send_direct(
    State(state): State<AppState>,
    RequireAuth(profile): RequireAuth,
    Path(user_id): Path<UserId>,
    Json(body): Json<SendMessage>,
) -> Result<(StatusCode, Json<ChatMessage>)> {
    let message = state
        .messaging()
        .send_direct_message(&profile, user_id, &body.message)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// The administrator to open a direct chat with; 404 when there is none.
pub async fn admin_contact(
    State(state): State<AppState>,
    RequireAuth(_profile): RequireAuth,
) -> Result<Json<AdminContact>> {
    let admin = state.messaging().admin_contact().await?;
    Ok(Json(AdminContact {
        id: admin.id,
        name: admin.name,
    }))
}
