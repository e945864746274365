//! Who may read a service request and its message thread.

use crate::lifecycle::{Actor, LifecycleError};
use crate::model::ServiceRequest;
use crate::types::{RequestStatus, Role};

/// Whether `actor` may read `request`.
///
/// Admins see everything and clients see their own requests. Collaborators
/// see requests assigned to them, plus unclaimed pending requests they could
/// quote.
#[must_use]
pub fn can_view(request: &ServiceRequest, actor: &Actor) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Client => request.is_owned_by(actor.id),
        Role::Collaborator => {
            request.is_assigned_to(actor.id)
                || (request.status == RequestStatus::Pending && !request.is_claimed())
        }
    }
}

/// [`can_view`] as a guard.
///
/// # Errors
///
/// Returns [`LifecycleError::Forbidden`] when the actor may not read the request.
pub fn ensure_can_view(request: &ServiceRequest, actor: &Actor) -> Result<(), LifecycleError> {
    if can_view(request, actor) {
        Ok(())
    } else {
        Err(LifecycleError::Forbidden("request is not visible to you"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{in_status, pending_request};
    use crate::types::UserId;

    #[test]
    fn test_admin_and_owner_always_see() {
        let client = Actor::new(UserId::random(), Role::Client);
        let admin = Actor::new(UserId::random(), Role::Admin);
        let collaborator = UserId::random();

        for status in RequestStatus::ALL {
            let request = in_status(1, client.id, collaborator, status);
            assert!(can_view(&request, &client));
            assert!(can_view(&request, &admin));
        }
    }

    #[test]
    fn test_other_client_never_sees() {
        let owner = UserId::random();
        let other = Actor::new(UserId::random(), Role::Client);

        for status in RequestStatus::ALL {
            let request = in_status(1, owner, UserId::random(), status);
            assert!(!can_view(&request, &other));
        }
    }

    #[test]
    fn test_collaborators_see_open_requests() {
        let request = pending_request(1, UserId::random());
        let anyone = Actor::new(UserId::random(), Role::Collaborator);
        assert!(can_view(&request, &anyone));
    }

    #[test]
    fn test_second_collaborator_refused_after_claim() {
        let xavier = Actor::new(UserId::random(), Role::Collaborator);
        let yara = Actor::new(UserId::random(), Role::Collaborator);
        let request = in_status(1, UserId::random(), xavier.id, RequestStatus::Responded);

        assert!(can_view(&request, &xavier));
        assert!(!can_view(&request, &yara));
        assert!(matches!(
            ensure_can_view(&request, &yara),
            Err(LifecycleError::Forbidden(_))
        ));
    }
}
