//! The service request state machine.
//!
//! [`Lifecycle::plan`] evaluates the guards for one user action against the
//! current request and returns the [`Transition`] the store must apply. It
//! never mutates anything: the store applies the transition atomically,
//! re-checking the `from` state as a compare-and-set precondition so that a
//! concurrent writer cannot slip in between plan and apply.
//!
//! | From             | Action         | Actor                   | To               |
//! |------------------|----------------|-------------------------|------------------|
//! | `Pending`        | `SubmitQuote`  | any collaborator        | `Responded`      |
//! | `Responded`      | `AcceptQuote`  | owning client           | `ClosedByClient` |
//! | `ClosedByClient` | `Schedule`     | assigned collaborator   | `Scheduled`      |
//! | `Scheduled`      | `Schedule`     | assigned collaborator   | `Scheduled`      |
//! | `Scheduled`      | `Complete`     | assigned collaborator   | `Completed`      |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Profile, ServiceRequest};
use crate::types::{RequestStatus, Role, UserId};
use crate::validation::ValidationError;

/// The user performing an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }
}

impl From<&Profile> for Actor {
    fn from(profile: &Profile) -> Self {
        Self::new(profile.id, profile.role)
    }
}

/// A lifecycle event requested by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Quote a pending request, claiming it.
    SubmitQuote,
    /// Accept the quote on a responded request.
    AcceptQuote,
    /// Put the visit on the agenda, or move it.
    Schedule { at: DateTime<Utc> },
    /// Mark the visit done.
    Complete,
}

impl Action {
    /// Short name used in logs and error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SubmitQuote => "submit quote",
            Self::AcceptQuote => "accept quote",
            Self::Schedule { .. } => "schedule",
            Self::Complete => "complete",
        }
    }
}

/// A write the store performs as part of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Insert the collaborator's quote.
    CreateQuote,
    /// Record the collaborator as assignee, with their name and `responded_at`.
    Assign { collaborator: UserId },
    /// Set the request's execution date.
    SetExecutionDate(DateTime<Utc>),
    /// Insert the agenda item for the visit.
    CreateAgendaItem,
    /// Move the existing agenda item to the new date.
    MoveAgendaItem,
    /// Set `completed_at` on the request.
    MarkCompleted,
    /// Mark the agenda item completed.
    CompleteAgendaItem,
}

/// A planned, guard-checked status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub effects: Vec<Effect>,
}

impl Transition {
    /// Whether this transition moves an already scheduled visit.
    #[must_use]
    pub fn is_reschedule(&self) -> bool {
        self.from == RequestStatus::Scheduled && self.to == RequestStatus::Scheduled
    }

    #[must_use]
    pub fn has_effect(&self, effect: &Effect) -> bool {
        self.effects.contains(effect)
    }

    /// The collaborator an [`Effect::Assign`] hands the request to.
    #[must_use]
    pub fn assignee(&self) -> Option<UserId> {
        self.effects.iter().find_map(|effect| match effect {
            Effect::Assign { collaborator } => Some(*collaborator),
            _ => None,
        })
    }

    /// The visit date an [`Effect::SetExecutionDate`] writes.
    #[must_use]
    pub fn execution_date(&self) -> Option<DateTime<Utc>> {
        self.effects.iter().find_map(|effect| match effect {
            Effect::SetExecutionDate(at) => Some(*at),
            _ => None,
        })
    }
}

/// Reasons a lifecycle action is refused.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// The actor's role or relationship to the request does not allow it.
    #[error("access restricted: {0}")]
    Forbidden(&'static str),

    /// The action is out of order for the request's current status.
    #[error("cannot {action} a request that is {status}")]
    InvalidState {
        action: &'static str,
        status: RequestStatus,
    },

    /// Another collaborator claimed the request first.
    #[error("request has already been claimed by another collaborator")]
    AlreadyClaimed,

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Guard evaluation for the request lifecycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lifecycle;

impl Lifecycle {
    /// Decide whether `actor` may perform `action` on `request`.
    ///
    /// Role and ownership are checked before state, so an actor with no
    /// business on the request learns nothing about its status.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Forbidden`] for role or ownership violations.
    /// - [`LifecycleError::AlreadyClaimed`] when quoting a claimed request.
    /// - [`LifecycleError::InvalidState`] for out-of-order actions.
    pub fn plan(
        request: &ServiceRequest,
        actor: &Actor,
        action: Action,
    ) -> Result<Transition, LifecycleError> {
        let from = request.status;
        let invalid = || LifecycleError::InvalidState {
            action: action.name(),
            status: from,
        };

        let (to, effects) = match action {
            Action::SubmitQuote => {
                if actor.role != Role::Collaborator {
                    return Err(LifecycleError::Forbidden("only collaborators can quote"));
                }
                if request.is_claimed() {
                    return Err(LifecycleError::AlreadyClaimed);
                }
                if from != RequestStatus::Pending {
                    return Err(invalid());
                }
                (
                    RequestStatus::Responded,
                    vec![
                        Effect::CreateQuote,
                        Effect::Assign {
                            collaborator: actor.id,
                        },
                    ],
                )
            }
            Action::AcceptQuote => {
                if actor.role != Role::Client || !request.is_owned_by(actor.id) {
                    return Err(LifecycleError::Forbidden(
                        "only the requesting client can accept the quote",
                    ));
                }
                if from != RequestStatus::Responded {
                    return Err(invalid());
                }
                (RequestStatus::ClosedByClient, Vec::new())
            }
            Action::Schedule { at } => {
                Self::require_assignee(request, actor)?;
                match from {
                    RequestStatus::ClosedByClient => (
                        RequestStatus::Scheduled,
                        vec![Effect::SetExecutionDate(at), Effect::CreateAgendaItem],
                    ),
                    RequestStatus::Scheduled => (
                        RequestStatus::Scheduled,
                        vec![Effect::SetExecutionDate(at), Effect::MoveAgendaItem],
                    ),
                    _ => return Err(invalid()),
                }
            }
            Action::Complete => {
                Self::require_assignee(request, actor)?;
                if from != RequestStatus::Scheduled {
                    return Err(invalid());
                }
                (
                    RequestStatus::Completed,
                    vec![Effect::MarkCompleted, Effect::CompleteAgendaItem],
                )
            }
        };

        debug_assert!(from.can_transition_to(to));
        Ok(Transition { from, to, effects })
    }

    fn require_assignee(request: &ServiceRequest, actor: &Actor) -> Result<(), LifecycleError> {
        if actor.role == Role::Collaborator && request.is_assigned_to(actor.id) {
            Ok(())
        } else {
            Err(LifecycleError::Forbidden(
                "only the assigned collaborator can do this",
            ))
        }
    }
}
