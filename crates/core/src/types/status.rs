//! Role, priority and status enums.
//!
//! All three are stored as PostgreSQL enum types and travel as `snake_case`
//! strings on the wire.

use serde::{Deserialize, Serialize};

/// Error returned when parsing one of the enums from text fails.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// What a user is allowed to do in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Submits requests and accepts quotes.
    Client,
    /// Quotes, schedules and completes requests.
    Collaborator,
    /// Sees everything and manages users.
    Admin,
}

impl Role {
    /// Text form used in URLs, SQL and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Collaborator => "collaborator",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "collaborator" => Ok(Self::Collaborator),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseEnumError::new("role", s)),
        }
    }
}

/// Urgency chosen by the client at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "request_priority", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl std::str::FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ParseEnumError::new("priority", s)),
        }
    }
}

/// Lifecycle state of a service request.
///
/// ```text
/// Pending -> Responded -> ClosedByClient -> Scheduled -> Completed
///                                              ^  |
///                                              +--+ (reschedule)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "request_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Submitted, no collaborator has quoted yet.
    Pending,
    /// A collaborator quoted and claimed the request.
    Responded,
    /// The client accepted the quote.
    ClosedByClient,
    /// A visit is on the collaborator's agenda.
    Scheduled,
    /// The visit happened. Terminal.
    Completed,
}

impl RequestStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Responded,
        Self::ClosedByClient,
        Self::Scheduled,
        Self::Completed,
    ];

    /// Text form used in SQL and query strings.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Responded => "responded",
            Self::ClosedByClient => "closed_by_client",
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
        }
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// `Scheduled -> Scheduled` is the reschedule edge.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Responded)
                | (Self::Responded, Self::ClosedByClient)
                | (Self::ClosedByClient | Self::Scheduled, Self::Scheduled)
                | (Self::Scheduled, Self::Completed)
        )
    }

    /// Whether no further transitions exist.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Whether a collaborator must be assigned in this state.
    #[must_use]
    pub const fn requires_assignee(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether an execution date must be set in this state.
    #[must_use]
    pub const fn requires_execution_date(self) -> bool {
        matches!(self, Self::Scheduled | Self::Completed)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("request status", s))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_only_forward_edges_allowed() {
        use RequestStatus::*;

        let allowed = [
            (Pending, Responded),
            (Responded, ClosedByClient),
            (ClosedByClient, Scheduled),
            (Scheduled, Scheduled),
            (Scheduled, Completed),
        ];

        for from in RequestStatus::ALL {
            for to in RequestStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_completed_is_terminal() {
        assert!(RequestStatus::Completed.is_terminal());
        assert!(!RequestStatus::Scheduled.is_terminal());
    }

    #[test]
    fn test_status_text_roundtrip() {
        for status in RequestStatus::ALL {
            assert_eq!(status.as_str().parse::<RequestStatus>().unwrap(), status);
        }
        assert!("Agendado".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn test_role_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Role::Collaborator).unwrap(),
            "\"collaborator\""
        );
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
    }
}
