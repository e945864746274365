//! Role-specific read projections.
//!
//! Each dashboard is a pure filter over records the caller already loaded.
//! Request lists are newest first.

use serde::{Deserialize, Serialize};

use crate::model::{AgendaItem, Profile, ServiceRequest};
use crate::types::{RequestStatus, Role, UserId};

/// Requests shown in the admin's "recent" list before the archive starts.
pub const ADMIN_RECENT_LIMIT: usize = 20;

fn newest_first<'a>(requests: impl Iterator<Item = &'a ServiceRequest>) -> Vec<ServiceRequest> {
    let mut list: Vec<ServiceRequest> = requests.cloned().collect();
    list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    list
}

/// What a client sees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDashboard {
    pub awaiting_quote: Vec<ServiceRequest>,
    pub quotes_to_review: Vec<ServiceRequest>,
    pub scheduled: Vec<ServiceRequest>,
    pub history: Vec<ServiceRequest>,
}

impl ClientDashboard {
    /// Project `client`'s requests.
    #[must_use]
    pub fn build(client: UserId, requests: &[ServiceRequest]) -> Self {
        let own = || requests.iter().filter(move |r| r.is_owned_by(client));
        let with = |status: RequestStatus| newest_first(own().filter(move |r| r.status == status));

        Self {
            awaiting_quote: with(RequestStatus::Pending),
            quotes_to_review: with(RequestStatus::Responded),
            scheduled: newest_first(own().filter(|r| {
                matches!(
                    r.status,
                    RequestStatus::ClosedByClient | RequestStatus::Scheduled
                )
            })),
            history: newest_first(own()),
        }
    }
}

/// What a collaborator sees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaboratorDashboard {
    pub open_requests: Vec<ServiceRequest>,
    /// Upcoming visits, soonest first.
    pub agenda: Vec<AgendaItem>,
    pub in_progress: Vec<ServiceRequest>,
    pub finished: Vec<ServiceRequest>,
}

impl CollaboratorDashboard {
    /// Project the open pool plus `collaborator`'s own work.
    #[must_use]
    pub fn build(
        collaborator: UserId,
        requests: &[ServiceRequest],
        agenda: &[AgendaItem],
    ) -> Self {
        let own = || requests.iter().filter(move |r| r.is_assigned_to(collaborator));

        let mut upcoming: Vec<AgendaItem> = agenda
            .iter()
            .filter(|item| {
                item.collaborator_id == collaborator && item.status == RequestStatus::Scheduled
            })
            .cloned()
            .collect();
        upcoming.sort_by_key(|item| (item.execution_datetime, item.id));

        Self {
            open_requests: newest_first(
                requests
                    .iter()
                    .filter(|r| r.status == RequestStatus::Pending && !r.is_claimed()),
            ),
            agenda: upcoming,
            in_progress: newest_first(own().filter(|r| r.status != RequestStatus::Completed)),
            finished: newest_first(own().filter(|r| r.status == RequestStatus::Completed)),
        }
    }
}

/// What the administrator sees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminDashboard {
    pub recent: Vec<ServiceRequest>,
    pub archive: Vec<ServiceRequest>,
    pub clients: Vec<Profile>,
    pub collaborators: Vec<Profile>,
}

impl AdminDashboard {
    /// Project every request, optionally narrowed to one status, plus the
    /// user rosters.
    #[must_use]
    pub fn build(
        requests: &[ServiceRequest],
        status: Option<RequestStatus>,
        profiles: &[Profile],
    ) -> Self {
        let mut all = newest_first(
            requests
                .iter()
                .filter(|r| status.is_none_or(|s| r.status == s)),
        );
        let archive = all.split_off(all.len().min(ADMIN_RECENT_LIMIT));

        let roster = |role: Role| -> Vec<Profile> {
            let mut list: Vec<Profile> =
                profiles.iter().filter(|p| p.role == role).cloned().collect();
            list.sort_by(|a, b| a.name.cmp(&b.name));
            list
        };

        Self {
            recent: all,
            archive,
            clients: roster(Role::Client),
            collaborators: roster(Role::Collaborator),
        }
    }
}

/// A dashboard for any role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Dashboard {
    Client(ClientDashboard),
    Collaborator(CollaboratorDashboard),
    Admin(AdminDashboard),
}
