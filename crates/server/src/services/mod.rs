//! Business services.
//!
//! Each user action is one read plus one conditional write. The lifecycle
//! engine in `fixflow-core` decides; the store applies the write atomically.

pub mod dashboard;
pub mod identity;
pub mod lifecycle;
pub mod messaging;
pub mod profiles;

use thiserror::Error;

use fixflow_core::{LifecycleError, ValidationError};

use crate::db::RepositoryError;

pub use dashboard::{AgendaView, DashboardService};
pub use identity::{
    HostedIdentityProvider, IdentityError, IdentityProvider, IdentitySession, IdentityUser,
    LocalIdentityProvider,
};
pub use lifecycle::{LifecycleService, RequestDetails};
pub use messaging::MessagingService;
pub use profiles::{ProfileService, SignUpDetails};

/// Errors returned by the services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A record the action depends on does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// No administrator profile exists to talk to.
    #[error("no administrator available, cannot start chat")]
    NoAdminContact,

    /// A lifecycle plan lacked the effect a write is built from.
    #[error("lifecycle plan has no {0} effect")]
    IncompletePlan(&'static str),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Turn a missing row into [`ServiceError::NotFound`].
pub(crate) fn found<T>(value: Option<T>, what: &'static str) -> Result<T, ServiceError> {
    value.ok_or(ServiceError::NotFound(what))
}
