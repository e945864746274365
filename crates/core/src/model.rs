//! Domain records.
//!
//! [`ServiceRequest`] is the aggregate root. [`Quote`] and [`AgendaItem`] are
//! request-scoped satellites written by lifecycle transitions; they outlive
//! the transition that created them as history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    AgendaItemId, ChatMessageId, Email, Price, Priority, QuoteId, RequestId, RequestStatus, Role,
    UserId,
};

/// A user profile, keyed by the identity provider's user ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub role: Role,
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A profile to insert at sign-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub id: UserId,
    pub role: Role,
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub address: String,
}

/// Fields a user may edit on their own profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

impl ProfileUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.address.is_none() && self.phone.is_none()
    }
}

/// A customer-submitted repair job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: RequestId,
    pub client_id: UserId,
    /// Client display name at submission time.
    pub client_name: String,
    pub assigned_collaborator_id: Option<UserId>,
    /// Recorded when the request is claimed.
    pub collaborator_name: Option<String>,
    pub description: String,
    pub priority: Priority,
    pub status: RequestStatus,
    /// `data:` URLs, at most five.
    pub photos: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub execution_date: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ServiceRequest {
    /// Whether a collaborator has claimed this request.
    #[must_use]
    pub const fn is_claimed(&self) -> bool {
        self.assigned_collaborator_id.is_some()
    }

    /// Whether `user` is the assigned collaborator.
    #[must_use]
    pub fn is_assigned_to(&self, user: UserId) -> bool {
        self.assigned_collaborator_id == Some(user)
    }

    /// Whether `user` owns this request.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.client_id == user
    }

    /// Check the structural invariants tying status to assignment and dates.
    ///
    /// Returns a description of the first violation.
    #[must_use]
    pub fn invariant_violation(&self) -> Option<&'static str> {
        if self.status.requires_assignee() != self.assigned_collaborator_id.is_some() {
            return Some("assigned collaborator must be set exactly when not pending");
        }
        if self.status.requires_execution_date() != self.execution_date.is_some() {
            return Some("execution date must be set exactly when scheduled or completed");
        }
        if (self.status == RequestStatus::Completed) != self.completed_at.is_some() {
            return Some("completion time must be set exactly when completed");
        }
        None
    }
}

/// Input for a new request, after intake validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewServiceRequest {
    pub client_id: UserId,
    pub client_name: String,
    pub description: String,
    pub priority: Priority,
    pub photos: Vec<String>,
}

/// A collaborator's priced proposal. Created once per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub request_id: RequestId,
    pub collaborator_id: UserId,
    pub price: Price,
    pub labor_description: String,
    pub materials_list: String,
    pub suggested_execution_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A scheduled visit on a collaborator's agenda. One per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgendaItem {
    pub id: AgendaItemId,
    pub collaborator_id: UserId,
    pub request_id: RequestId,
    pub client_name: String,
    pub client_address: String,
    pub description: String,
    pub execution_datetime: DateTime<Utc>,
    /// Mirrors the request: `Scheduled` or `Completed`.
    pub status: RequestStatus,
}

/// A chat message, request-scoped or direct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: ChatMessageId,
    /// `None` for the direct (admin) channel.
    pub request_id: Option<RequestId>,
    pub sender_id: UserId,
    pub sender_name: String,
    /// The sender's current role, looked up on read. `None` once the
    /// sender's profile is gone.
    #[serde(default)]
    pub sender_role: Option<Role>,
    /// Set only on the direct channel.
    pub recipient_id: Option<UserId>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// A message ready to be appended to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatMessage {
    pub addressing: crate::messaging::Addressing,
    pub sender_id: UserId,
    pub sender_name: String,
    pub message: String,
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_fixtures_satisfy_invariants() {
        let client = UserId::random();
        let collaborator = UserId::random();
        for status in RequestStatus::ALL {
            let request = in_status(1, client, collaborator, status);
            assert_eq!(request.invariant_violation(), None, "{status}");
        }
    }

    #[test]
    fn test_pending_with_assignee_is_a_violation() {
        let mut request = pending_request(1, UserId::random());
        request.assigned_collaborator_id = Some(UserId::random());
        assert!(request.invariant_violation().is_some());
    }

    #[test]
    fn test_profile_update_is_empty() {
        assert!(ProfileUpdate::default().is_empty());
        let update = ProfileUpdate {
            phone: Some("555-0100".to_owned()),
            ..ProfileUpdate::default()
        };
        assert!(!update.is_empty());
    }
}
