//! HTTP middleware and extractors.

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{RequireAdmin, RequireAuth, clear_current_user, set_current_user};
pub use request_id::{REQUEST_ID, request_id_middleware};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
