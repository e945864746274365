//! Role-specific dashboards and the collaborator agenda.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::instrument;

use fixflow_core::agenda::{agenda_for_day, days_with_service};
use fixflow_core::dashboard::{AdminDashboard, ClientDashboard, CollaboratorDashboard, Dashboard};
use fixflow_core::{AgendaItem, LifecycleError, Profile, RequestStatus, Role};

use super::ServiceError;
use crate::db::{RequestFilter, Store};

/// A collaborator's agenda, optionally narrowed to one day.
#[derive(Debug, Clone, Serialize)]
pub struct AgendaView {
    /// Upcoming visits, soonest first.
    pub items: Vec<AgendaItem>,
    /// Days of the shown month with at least one upcoming visit.
    pub service_days: BTreeSet<u32>,
}

/// Loads the records behind each dashboard.
pub struct DashboardService<'a> {
    store: &'a dyn Store,
}

impl<'a> DashboardService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// The dashboard for `user`'s role. `status` only narrows the admin view.
    ///
    /// # Errors
    ///
    /// Returns `Repository` if the store fails.
    #[instrument(skip(self, user), fields(actor = %user.id, role = %user.role))]
    pub async fn for_user(
        &self,
        user: &Profile,
        status: Option<RequestStatus>,
    ) -> Result<Dashboard, ServiceError> {
        Ok(match user.role {
            Role::Client => Dashboard::Client(self.client(user).await?),
            Role::Collaborator => Dashboard::Collaborator(self.collaborator(user).await?),
            Role::Admin => Dashboard::Admin(self.admin(status).await?),
        })
    }

    /// # Errors
    ///
    /// Returns `Repository` if the store fails.
    pub async fn client(&self, client: &Profile) -> Result<ClientDashboard, ServiceError> {
        let requests = self
            .store
            .list_requests(&RequestFilter::for_client(client.id))
            .await?;
        Ok(ClientDashboard::build(client.id, &requests))
    }

    /// # Errors
    ///
    /// Returns `Repository` if the store fails.
    pub async fn collaborator(
        &self,
        collaborator: &Profile,
    ) -> Result<CollaboratorDashboard, ServiceError> {
        let mut requests = self.store.list_requests(&RequestFilter::open()).await?;
        requests.extend(
            self.store
                .list_requests(&RequestFilter::assigned_to(collaborator.id))
                .await?,
        );
        let agenda = self.store.list_agenda(collaborator.id).await?;
        Ok(CollaboratorDashboard::build(
            collaborator.id,
            &requests,
            &agenda,
        ))
    }

    /// # Errors
    ///
    /// Returns `Repository` if the store fails.
    pub async fn admin(&self, status: Option<RequestStatus>) -> Result<AdminDashboard, ServiceError> {
        let requests = self.store.list_requests(&RequestFilter::default()).await?;
        let mut profiles = self.store.list_profiles_by_role(Role::Client).await?;
        profiles.extend(self.store.list_profiles_by_role(Role::Collaborator).await?);
        Ok(AdminDashboard::build(&requests, status, &profiles))
    }

    /// Upcoming visits of `collaborator`, all of them or those on `date`.
    ///
    /// `today` picks the month whose service days are reported when no date
    /// is given.
    ///
    /// # Errors
    ///
    /// - `Forbidden` for anyone but collaborators.
    /// - `Repository` if the store fails.
    #[instrument(skip(self, collaborator), fields(actor = %collaborator.id))]
    pub async fn agenda(
        &self,
        collaborator: &Profile,
        date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<AgendaView, ServiceError> {
        if collaborator.role != Role::Collaborator {
            return Err(LifecycleError::Forbidden("only collaborators have an agenda").into());
        }

        let all = self.store.list_agenda(collaborator.id).await?;
        let month = date.unwrap_or(today);
        let service_days = days_with_service(&all, month.year(), month.month());

        let items = match date {
            Some(day) => agenda_for_day(&all, day),
            None => {
                let mut upcoming: Vec<AgendaItem> = all
                    .into_iter()
                    .filter(|item| item.status == RequestStatus::Scheduled)
                    .collect();
                upcoming.sort_by_key(|item| (item.execution_datetime, item.id));
                upcoming
            }
        };

        Ok(AgendaView {
            items,
            service_days,
        })
    }
}
