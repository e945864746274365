//! Request lifecycle service: intake, quoting, acceptance, scheduling and
//! completion.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use fixflow_core::agenda::{AgendaSeed, DEFAULT_AGENDA_DESCRIPTION, QuoteDraft};
use fixflow_core::validation::NewRequestInput;
use fixflow_core::visibility::ensure_can_view;
use fixflow_core::{
    Action, Actor, AgendaItem, AgendaItemId, Lifecycle, LifecycleError, Profile, Quote, RequestId,
    Role, ServiceRequest,
};

use super::{ServiceError, found};
use crate::db::{RepositoryError, RespondCommand, ScheduleCommand, Store};

/// A request as shown on its detail page.
#[derive(Debug, Clone, Serialize)]
pub struct RequestDetails {
    pub request: ServiceRequest,
    pub quote: Option<Quote>,
    /// `None` once the client's profile has been deleted.
    pub client: Option<Profile>,
}

/// Drives requests through their lifecycle.
pub struct LifecycleService<'a> {
    store: &'a dyn Store,
}

impl<'a> LifecycleService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    async fn load(&self, id: RequestId) -> Result<ServiceRequest, ServiceError> {
        found(self.store.get_request(id).await?, "request")
    }

    /// Open a new request on behalf of `client`.
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless `client` is a client.
    /// - `Validation` for a blank description or unacceptable photos.
    #[instrument(skip(self, client, input), fields(actor = %client.id, photos = input.photos.len()))]
    pub async fn submit_request(
        &self,
        client: &Profile,
        input: NewRequestInput,
    ) -> Result<ServiceRequest, ServiceError> {
        if client.role != Role::Client {
            return Err(LifecycleError::Forbidden("only clients can open requests").into());
        }

        let new_request = input.into_new_request(client)?;
        let request = self.store.create_request(&new_request).await?;

        info!(request_id = %request.id, "Request opened");
        Ok(request)
    }

    /// Claim a pending request with a quote.
    ///
    /// # Errors
    ///
    /// - `Forbidden` for non-collaborators.
    /// - `AlreadyClaimed` when another collaborator got there first, including
    ///   when they win the race between our read and our write.
    /// - `Validation` for an incomplete quote.
    #[instrument(skip(self, collaborator, draft), fields(actor = %collaborator.id))]
    pub async fn submit_quote(
        &self,
        collaborator: &Profile,
        request_id: RequestId,
        draft: &QuoteDraft,
    ) -> Result<(ServiceRequest, Quote), ServiceError> {
        let request = self.load(request_id).await?;
        let transition =
            Lifecycle::plan(&request, &Actor::from(collaborator), Action::SubmitQuote)?;
        let terms = draft.validate()?;

        let command = RespondCommand::from_plan(
            request_id,
            &transition,
            collaborator.name.clone(),
            terms,
        )
        .ok_or(ServiceError::IncompletePlan("assign"))?;
        let (request, quote) = self.store.respond(&command).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => ServiceError::Lifecycle(LifecycleError::AlreadyClaimed),
            other => other.into(),
        })?;

        info!(quote_id = %quote.id, price = %quote.price, "Quote submitted");
        Ok((request, quote))
    }

    /// Accept the quote on a responded request.
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless `client` owns the request.
    /// - `InvalidState` unless the request is responded.
    #[instrument(skip(self, client), fields(actor = %client.id))]
    pub async fn accept_quote(
        &self,
        client: &Profile,
        request_id: RequestId,
    ) -> Result<ServiceRequest, ServiceError> {
        let request = self.load(request_id).await?;
        Lifecycle::plan(&request, &Actor::from(client), Action::AcceptQuote)?;

        let request = self.store.accept_quote(request_id, client.id).await?;
        info!("Quote accepted");
        Ok(request)
    }

    /// Put the visit on the agenda, or move it when already scheduled.
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless `collaborator` is the assignee.
    /// - `InvalidState` unless the request is closed by the client or scheduled.
    #[instrument(skip(self, collaborator), fields(actor = %collaborator.id))]
    pub async fn schedule(
        &self,
        collaborator: &Profile,
        request_id: RequestId,
        at: DateTime<Utc>,
    ) -> Result<(ServiceRequest, AgendaItem), ServiceError> {
        let request = self.load(request_id).await?;
        let transition = Lifecycle::plan(&request, &Actor::from(collaborator), Action::Schedule {
            at,
        })?;

        let seed = match self.store.get_profile(request.client_id).await? {
            Some(client) => AgendaSeed::from_client(&client, &request),
            None => AgendaSeed {
                client_name: request.client_name.clone(),
                client_address: String::new(),
                description: DEFAULT_AGENDA_DESCRIPTION.to_owned(),
            },
        };

        let command = ScheduleCommand::from_plan(request_id, collaborator.id, &transition, seed)
            .ok_or(ServiceError::IncompletePlan("execution date"))?;
        let (request, item) = self.store.schedule(&command).await?;

        info!(
            agenda_item_id = %item.id,
            reschedule = transition.is_reschedule(),
            "Visit scheduled"
        );
        Ok((request, item))
    }

    /// Mark a scheduled visit, and its request, completed.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown agenda item.
    /// - `Forbidden` unless `collaborator` is the assignee.
    /// - `InvalidState` unless the request is scheduled.
    #[instrument(skip(self, collaborator), fields(actor = %collaborator.id))]
    pub async fn complete(
        &self,
        collaborator: &Profile,
        item_id: AgendaItemId,
    ) -> Result<(ServiceRequest, AgendaItem), ServiceError> {
        let item = found(self.store.get_agenda_item(item_id).await?, "agenda item")?;
        let request = self.load(item.request_id).await?;
        Lifecycle::plan(&request, &Actor::from(collaborator), Action::Complete)?;

        let completed = self.store.complete(item_id, collaborator.id).await?;
        info!(request_id = %request.id, "Visit completed");
        Ok(completed)
    }

    /// A request with its quote and client, if `viewer` may see it.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown request.
    /// - `Forbidden` when the visibility rule refuses `viewer`.
    #[instrument(skip(self, viewer), fields(actor = %viewer.id))]
    pub async fn request_details(
        &self,
        viewer: &Profile,
        request_id: RequestId,
    ) -> Result<RequestDetails, ServiceError> {
        let request = self.load(request_id).await?;
        ensure_can_view(&request, &Actor::from(viewer))?;

        let quote = self.store.get_quote(request_id).await?;
        let client = self.store.get_profile(request.client_id).await?;
        Ok(RequestDetails {
            request,
            quote,
            client,
        })
    }
}
