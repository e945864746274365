//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before the response is built; everything else maps to
//! a 4xx status with a JSON body of the form `{"error": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use fixflow_core::LifecycleError;

use crate::db::RepositoryError;
use crate::services::{IdentityError, ServiceError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Identity provider call failed.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Session storage failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        Self::Service(err.into())
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        Self::Service(err.into())
    }
}

impl AppError {
    /// Whether this is our fault rather than the caller's.
    fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Service(
                ServiceError::IncompletePlan(_)
                    | ServiceError::Repository(
                        RepositoryError::Database(_) | RepositoryError::DataCorruption(_)
                    )
            ) | Self::Identity(
                IdentityError::Http(_) | IdentityError::Api { .. } | IdentityError::PasswordHash
            ) | Self::Session(_)
                | Self::Internal(_)
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Service(err) => match err {
                ServiceError::NotFound(_)
                | ServiceError::NoAdminContact
                | ServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
                ServiceError::Validation(_)
                | ServiceError::Lifecycle(LifecycleError::Validation(_)) => StatusCode::BAD_REQUEST,
                ServiceError::Lifecycle(LifecycleError::Forbidden(_)) => StatusCode::FORBIDDEN,
                ServiceError::Lifecycle(
                    LifecycleError::InvalidState { .. } | LifecycleError::AlreadyClaimed,
                )
                | ServiceError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
                ServiceError::IncompletePlan(_)
                | ServiceError::Repository(
                    RepositoryError::Database(_) | RepositoryError::DataCorruption(_),
                ) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Identity(err) => match err {
                IdentityError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                IdentityError::AlreadyRegistered => StatusCode::CONFLICT,
                IdentityError::WeakPassword(_) | IdentityError::InvalidEmail(_) => {
                    StatusCode::BAD_REQUEST
                }
                IdentityError::Http(_) | IdentityError::Api { .. } => StatusCode::BAD_GATEWAY,
                IdentityError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to the client. Internal details are never exposed.
    fn public_message(&self) -> String {
        match self {
            Self::Service(
                ServiceError::IncompletePlan(_)
                | ServiceError::Repository(
                    RepositoryError::Database(_) | RepositoryError::DataCorruption(_),
                ),
            )
            | Self::Session(_)
            | Self::Internal(_) => "Internal server error".to_string(),
            Self::Service(ServiceError::Lifecycle(LifecycleError::Forbidden(_))) => {
                "access restricted".to_string()
            }
            Self::Service(err) => err.to_string(),
            Self::Identity(err) => match err {
                IdentityError::InvalidCredentials => "Invalid credentials".to_string(),
                IdentityError::AlreadyRegistered => {
                    "An account with this email already exists".to_string()
                }
                IdentityError::WeakPassword(msg) => msg.clone(),
                IdentityError::InvalidEmail(_) => "Invalid email address".to_string(),
                IdentityError::Http(_) | IdentityError::Api { .. } => {
                    "Identity provider unavailable".to_string()
                }
                IdentityError::PasswordHash => "Internal server error".to_string(),
            },
            Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request refused");
        }

        let body = serde_json::json!({ "error": self.public_message() });
        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a user action.
///
/// ```rust,ignore
/// add_breadcrumb("lifecycle", "Quote submitted", Some(&[("request_id", "42")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use fixflow_core::{RequestStatus, ValidationError};

    use super::*;

    fn status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_lifecycle_errors_map_to_status_codes() {
        assert_eq!(
            status(LifecycleError::Forbidden("nope")),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status(LifecycleError::InvalidState {
                action: "accept quote",
                status: RequestStatus::Pending,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(status(LifecycleError::AlreadyClaimed), StatusCode::CONFLICT);
        assert_eq!(
            status(LifecycleError::Validation(ValidationError::SelfAddressed)),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_service_errors_map_to_status_codes() {
        assert_eq!(
            status(ServiceError::NotFound("request")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status(ServiceError::NoAdminContact), StatusCode::NOT_FOUND);
        assert_eq!(
            status(RepositoryError::Conflict("taken".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(RepositoryError::DataCorruption("bad row".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(ServiceError::IncompletePlan("assign")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(AppError::Unauthorized("sign in".to_string())),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_identity_errors_map_to_status_codes() {
        assert_eq!(
            status(IdentityError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(IdentityError::AlreadyRegistered),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(IdentityError::Api {
                status: 500,
                message: "down".to_string(),
            }),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_messages_hide_internals() {
        let err = AppError::from(RepositoryError::DataCorruption("row 7".to_string()));
        assert_eq!(err.public_message(), "Internal server error");

        let err = AppError::from(LifecycleError::Forbidden("only collaborators can quote"));
        assert_eq!(err.public_message(), "access restricted");

        let err = AppError::from(ServiceError::NoAdminContact);
        assert!(err.public_message().contains("cannot start chat"));
    }
}
