//! Dashboards and the collaborator agenda.

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use fixflow_core::RequestStatus;
use fixflow_core::dashboard::Dashboard;

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::services::AgendaView;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// Admin only: narrow the request lists to one status.
    pub status: Option<RequestStatus>,
}

#[derive(Debug, Deserialize)]
pub struct AgendaQuery {
    pub date: Option<NaiveDate>,
}

/// The signed-in user's role-specific dashboard.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(profile): RequireAuth,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Dashboard>> {
    let dashboard = state.dashboards().for_user(&profile, query.status).await?;
    Ok(Json(dashboard))
}

pub async fn agenda(
    State(state): State<AppState>,
    RequireAuth(profile): RequireAuth,
    Query(query): Query<AgendaQuery>,
) -> Result<Json<AgendaView>> {
    let today = Utc::now().date_naive();
    let view = state
        .dashboards()
        .agenda(&profile, query.date, today)
        .await?;
    Ok(Json(view))
}
