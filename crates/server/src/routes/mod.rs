//! HTTP route handlers. Every endpoint speaks JSON.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness
//! GET    /health/ready                    - Readiness (store ping)
//!
//! # Auth
//! POST   /auth/sign-up                    - Create identity + client profile
//! POST   /auth/sign-in                    - Sign in, start session
//! POST   /auth/sign-out                   - End session
//!
//! # Profile (requires auth)
//! GET    /api/me                          - Current profile
//! PATCH  /api/me                          - Update name/address/phone
//!
//! # Requests (requires auth)
//! POST   /api/requests                    - Open a request (multipart)
//! GET    /api/requests/{id}               - Request, quote and client
//! POST   /api/requests/{id}/quote         - Collaborator quotes and claims
//! POST   /api/requests/{id}/accept        - Client accepts the quote
//! POST   /api/requests/{id}/schedule      - Collaborator schedules or reschedules
//! POST   /api/agenda/{id}/complete        - Collaborator completes the visit
//!
//! # Messages (requires auth)
//! GET    /api/requests/{id}/messages      - Request thread
//! POST   /api/requests/{id}/messages      - Post to request thread
//! GET    /api/direct/admin                - Administrator to chat with
//! GET    /api/direct/{user_id}/messages   - Direct thread with user
//! POST   /api/direct/{user_id}/messages   - Send direct message
//!
//! # Views (requires auth)
//! GET    /api/dashboard?status=           - Role-specific dashboard
//! GET    /api/agenda?date=YYYY-MM-DD      - Collaborator agenda
//!
//! # Admin (requires admin)
//! GET    /api/admin/users?role=client     - Roster
//! POST   /api/admin/users/{id}/promote    - Client to collaborator
//! DELETE /api/admin/users/{id}            - Delete profile
//! ```

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod me;
pub mod messages;
pub mod requests;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/sign-up", post(auth::sign_up))
        .route("/sign-in", post(auth::sign_in))
        .route("/sign-out", post(auth::sign_out))
}

/// Create the request routes router.
pub fn request_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(requests::create).layer(DefaultBodyLimit::max(requests::MAX_UPLOAD_BYTES)),
        )
        .route("/{id}", get(requests::show))
        .route("/{id}/quote", post(requests::quote))
        .route("/{id}/accept", post(requests::accept))
        .route("/{id}/schedule", post(requests::schedule))
        .route(
            "/{id}/messages",
            get(messages::request_thread).post(messages::send_to_request),
        )
}

/// Create the direct message routes router.
pub fn direct_routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(messages::admin_contact))
        .route(
            "/{user_id}/messages",
            get(messages::direct_thread).post(messages::send_direct),
        )
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{id}", axum::routing::delete(admin::delete_user))
        .route("/users/{id}/promote", post(admin::promote))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .route("/api/me", get(me::show).patch(me::update))
        .nest("/api/requests", request_routes())
        .route("/api/agenda", get(dashboard::agenda))
        .route("/api/agenda/{id}/complete", post(requests::complete))
        .nest("/api/direct", direct_routes())
        .route("/api/dashboard", get(dashboard::show))
        .nest("/api/admin", admin_routes())
}
