//! Service request intake and lifecycle actions.

use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fixflow_core::agenda::QuoteDraft;
use fixflow_core::validation::{MAX_PHOTO_BYTES, MAX_PHOTOS, NewRequestInput, PhotoUpload};
use fixflow_core::{AgendaItem, AgendaItemId, Priority, Quote, RequestId, ServiceRequest};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::services::RequestDetails;
use crate::state::AppState;

/// Upload ceiling for request intake: one photo over the limit still reaches
/// validation and gets a precise error instead of 413.
pub const MAX_UPLOAD_BYTES: usize = (MAX_PHOTOS + 1) * MAX_PHOTO_BYTES + 1024 * 1024;

/// A request together with its freshly created quote.
#[derive(Debug, Serialize)]
pub struct QuotedRequest {
    pub request: ServiceRequest,
    pub quote: Quote,
}

/// A request together with its agenda item.
#[derive(Debug, Serialize)]
pub struct ScheduledRequest {
    pub request: ServiceRequest,
    pub agenda_item: AgendaItem,
}

/// Schedule or reschedule body.
#[derive(Debug, Deserialize)]
pub struct ScheduleBody {
    pub execution_date: DateTime<Utc>,
}

#[allow(clippy::needless_pass_by_value)]
fn bad_multipart(err: MultipartError) -> AppError {
    AppError::BadRequest(format!("Invalid multipart body: {err}"))
}

/// Read the intake form: `description`, optional `priority`, and up to five
/// `photos` (or `photos[]`) parts.
async fn read_intake(mut multipart: Multipart) -> Result<NewRequestInput> {
    let mut input = NewRequestInput::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "description" => input.description = field.text().await.map_err(bad_multipart)?,
            "priority" => {
                let text = field.text().await.map_err(bad_multipart)?;
                if !text.trim().is_empty() {
                    input.priority = text
                        .trim()
                        .parse::<Priority>()
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                }
            }
            "photos" | "photos[]" => {
                let content_type = field.content_type().unwrap_or_default().to_owned();
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                input.photos.push(PhotoUpload {
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    Ok(input)
}

/// Open a request from a multipart form.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(profile): RequireAuth,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ServiceRequest>)> {
    let input = read_intake(multipart).await?;
    let request = state.lifecycle().submit_request(&profile, input).await?;

    let request_id = request.id.to_string();
    add_breadcrumb(
        "lifecycle",
        "Request opened",
        Some(&[("request_id", request_id.as_str())]),
    );
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn show(
    State(state): State<AppState>,
    RequireAuth(profile): RequireAuth,
    Path(id): Path<RequestId>,
) -> Result<Json<RequestDetails>> {
    let details = state.lifecycle().request_details(&profile, id).await?;
    Ok(Json(details))
}

/// A collaborator quotes and claims a pending request.
pub async fn quote(
    State(state): State<AppState>,
    RequireAuth(profile): RequireAuth,
    Path(id): Path<RequestId>,
    Json(draft): Json<QuoteDraft>,
) -> Result<(StatusCode, Json<QuotedRequest>)> {
    let (request, quote) = state.lifecycle().submit_quote(&profile, id, &draft).await?;

    let request_id = id.to_string();
    add_breadcrumb(
        "lifecycle",
        "Quote submitted",
        Some(&[("request_id", request_id.as_str())]),
    );
    Ok((StatusCode::CREATED, Json(QuotedRequest { request, quote })))
}

pub async fn accept(
    State(state): State<AppState>,
    RequireAuth(profile): RequireAuth,
    Path(id): Path<RequestId>,
) -> Result<Json<ServiceRequest>> {
    let request = state.lifecycle().accept_quote(&profile, id).await?;
    Ok(Json(request))
}

/// First schedule or reschedule, depending on the request's status.
pub async fn schedule(
    State(state): State<AppState>,
    RequireAuth(profile): RequireAuth,
    Path(id): Path<RequestId>,
    Json(body): Json<ScheduleBody>,
) -> Result<Json<ScheduledRequest>> {
    let (request, agenda_item) = state
        .lifecycle()
        .schedule(&profile, id, body.execution_date)
        .await?;
    Ok(Json(ScheduledRequest {
        request,
        agenda_item,
    }))
}

/// Complete a visit by its agenda item.
pub async fn complete(
    State(state): State<AppState>,
    RequireAuth(profile): RequireAuth,
    Path(id): Path<AgendaItemId>,
) -> Result<Json<ScheduledRequest>> {
    let (request, agenda_item) = state.lifecycle().complete(&profile, id).await?;

    let request_id = request.id.to_string();
    add_breadcrumb(
        "lifecycle",
        "Visit completed",
        Some(&[("request_id", request_id.as_str())]),
    );
    Ok(Json(ScheduledRequest {
        request,
        agenda_item,
    }))
}
