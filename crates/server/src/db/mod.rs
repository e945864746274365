//! Persistence for profiles, service requests and messages.
//!
//! # Tables
//!
//! - `profiles` - One row per identity-provider user, with role tag
//! - `service_requests` - Requests and their lifecycle columns
//! - `quotes` - One quote per request, written when it is claimed
//! - `agenda_items` - One visit per request, written when it is scheduled
//! - `chat_messages` - Append-only messages, request-scoped or direct
//! - `tower_sessions.session` - Session storage (created by the session store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p fixflow-cli -- migrate
//! ```
//!
//! # Store seams
//!
//! Services talk to the [`Store`] trait object. [`PgStore`] is the production
//! implementation; [`MemoryStore`] keeps everything in process with the same
//! compare-and-set semantics and backs the tests and `FIXFLOW_STORE=memory`.
//!
//! Every lifecycle write is conditional on the state the caller observed.
//! When the condition no longer holds, the write is discarded whole and the
//! store reports [`RepositoryError::Conflict`].

pub mod memory;
pub mod messages;
pub mod postgres;
pub mod profiles;
pub mod requests;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use fixflow_core::agenda::{AgendaSeed, QuoteTerms};
use fixflow_core::messaging::{DirectChannel, merge_direct};
use fixflow_core::{
    AgendaItem, AgendaItemId, ChatMessage, Effect, NewChatMessage, NewProfile, NewServiceRequest,
    Profile, ProfileUpdate, Quote, RequestId, RequestStatus, Role, ServiceRequest, Transition,
    UserId,
};

pub use memory::MemoryStore;
pub use messages::MessageRepository;
pub use postgres::PgStore;
pub use profiles::ProfileRepository;
pub use requests::RequestRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// A conditional write lost, or a unique constraint was hit.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Which requests to list. Unset fields do not filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub client_id: Option<UserId>,
    pub assigned_to: Option<UserId>,
    pub status: Option<RequestStatus>,
    /// Only requests no collaborator has claimed.
    pub unclaimed: bool,
}

impl RequestFilter {
    #[must_use]
    pub fn for_client(client: UserId) -> Self {
        Self {
            client_id: Some(client),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn assigned_to(collaborator: UserId) -> Self {
        Self {
            assigned_to: Some(collaborator),
            ..Self::default()
        }
    }

    /// Pending requests open for quoting.
    #[must_use]
    pub fn open() -> Self {
        Self {
            status: Some(RequestStatus::Pending),
            unclaimed: true,
            ..Self::default()
        }
    }

    /// Whether `request` passes the filter.
    #[must_use]
    pub fn matches(&self, request: &ServiceRequest) -> bool {
        self.client_id.is_none_or(|id| request.client_id == id)
            && self
                .assigned_to
                .is_none_or(|id| request.assigned_collaborator_id == Some(id))
            && self.status.is_none_or(|status| request.status == status)
            && (!self.unclaimed || !request.is_claimed())
    }
}

/// A collaborator claiming a pending request with a quote.
#[derive(Debug, Clone)]
pub struct RespondCommand {
    pub request_id: RequestId,
    pub collaborator_id: UserId,
    pub collaborator_name: String,
    pub terms: QuoteTerms,
}

/// Put a visit on the agenda, or move it.
#[derive(Debug, Clone)]
pub struct ScheduleCommand {
    pub request_id: RequestId,
    pub collaborator_id: UserId,
    /// Status the caller observed; the write only applies if it still holds.
    pub expected: RequestStatus,
    pub at: DateTime<Utc>,
    /// Denormalized agenda fields, used only when the item is created.
    pub seed: AgendaSeed,
}

impl RespondCommand {
    /// The claim a planned quote transition writes. `None` unless the plan
    /// both creates a quote and assigns a collaborator.
    #[must_use]
    pub fn from_plan(
        request_id: RequestId,
        transition: &Transition,
        collaborator_name: String,
        terms: QuoteTerms,
    ) -> Option<Self> {
        let collaborator_id = transition.assignee()?;
        transition
            .has_effect(&Effect::CreateQuote)
            .then_some(Self {
                request_id,
                collaborator_id,
                collaborator_name,
                terms,
            })
    }
}

impl ScheduleCommand {
    /// The agenda write a planned schedule transition calls for, guarded on
    /// the status the plan started from. `None` without an execution date.
    #[must_use]
    pub fn from_plan(
        request_id: RequestId,
        collaborator_id: UserId,
        transition: &Transition,
        seed: AgendaSeed,
    ) -> Option<Self> {
        Some(Self {
            request_id,
            collaborator_id,
            expected: transition.from,
            at: transition.execution_date()?,
            seed,
        })
    }
}

/// Profiles keyed by identity-provider user ID.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, id: UserId) -> Result<Option<Profile>, RepositoryError>;

    /// Profiles with `role`, ordered by name.
    async fn list_profiles_by_role(&self, role: Role) -> Result<Vec<Profile>, RepositoryError>;

    /// The earliest-created admin, if any.
    async fn first_admin(&self) -> Result<Option<Profile>, RepositoryError>;

    /// Insert a profile. A duplicate ID or email is a [`RepositoryError::Conflict`].
    async fn create_profile(&self, profile: &NewProfile) -> Result<Profile, RepositoryError>;

    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<Profile, RepositoryError>;

    /// Change a role, only if it is still `expected`.
    async fn update_role(
        &self,
        id: UserId,
        expected: Role,
        role: Role,
    ) -> Result<Profile, RepositoryError>;

    /// Delete the profile row only. Requests and messages keep their
    /// denormalized names.
    async fn delete_profile(&self, id: UserId) -> Result<(), RepositoryError>;
}

/// Service requests with their quotes and agenda items.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn create_request(
        &self,
        request: &NewServiceRequest,
    ) -> Result<ServiceRequest, RepositoryError>;

    async fn get_request(&self, id: RequestId) -> Result<Option<ServiceRequest>, RepositoryError>;

    /// Matching requests, newest first.
    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<ServiceRequest>, RepositoryError>;

    async fn get_quote(&self, request_id: RequestId) -> Result<Option<Quote>, RepositoryError>;

    /// Claim a pending, unassigned request and store the quote.
    ///
    /// Losing the race to another collaborator is a
    /// [`RepositoryError::Conflict`] and leaves no quote behind.
    async fn respond(
        &self,
        command: &RespondCommand,
    ) -> Result<(ServiceRequest, Quote), RepositoryError>;

    /// Move a responded request owned by `client` to closed-by-client.
    async fn accept_quote(
        &self,
        request_id: RequestId,
        client: UserId,
    ) -> Result<ServiceRequest, RepositoryError>;

    /// Set the execution date and create or move the agenda item.
    async fn schedule(
        &self,
        command: &ScheduleCommand,
    ) -> Result<(ServiceRequest, AgendaItem), RepositoryError>;

    async fn get_agenda_item(
        &self,
        id: AgendaItemId,
    ) -> Result<Option<AgendaItem>, RepositoryError>;

    /// All agenda items of `collaborator`, soonest first.
    async fn list_agenda(&self, collaborator: UserId) -> Result<Vec<AgendaItem>, RepositoryError>;

    /// Complete a scheduled visit and its request together.
    async fn complete(
        &self,
        item: AgendaItemId,
        collaborator: UserId,
    ) -> Result<(ServiceRequest, AgendaItem), RepositoryError>;
}

/// Append-only chat messages.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Store a message and return the canonical record.
    async fn append_message(&self, message: &NewChatMessage)
    -> Result<ChatMessage, RepositoryError>;

    /// Messages on a request thread, oldest first.
    async fn request_thread(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<ChatMessage>, RepositoryError>;

    /// Direct messages sent by `sender` to `recipient`, oldest first.
    async fn direct_messages(
        &self,
        sender: UserId,
        recipient: UserId,
    ) -> Result<Vec<ChatMessage>, RepositoryError>;

    /// Both directions of a direct channel, oldest first.
    async fn direct_thread(
        &self,
        channel: DirectChannel,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let (a, b) = channel.participants();
        let a_to_b = self.direct_messages(a, b).await?;
        let b_to_a = self.direct_messages(b, a).await?;
        Ok(merge_direct(a_to_b, b_to_a))
    }
}

/// Everything the services need from persistence.
#[async_trait]
pub trait Store: ProfileStore + RequestStore + MessageStore {
    /// Check the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(format!("{what} already exists"))
        }
        _ => RepositoryError::Database(err),
    }
}
