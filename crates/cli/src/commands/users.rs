//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! # Promote a client to collaborator
//! fixflow users promote 6f1c1c1e-9a3b-4c7d-8e2f-0a1b2c3d4e5f
//!
//! # Make someone the administrator (bootstrap)
//! fixflow users promote 6f1c1c1e-9a3b-4c7d-8e2f-0a1b2c3d4e5f --to admin
//!
//! # List collaborators
//! fixflow users list --role collaborator
//! ```
//!
//! Users sign up through the API; these commands only change existing
//! profiles.

use fixflow_core::{Role, UserId};
use fixflow_server::db::{ProfileRepository, RepositoryError};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Invalid user ID: {0}")]
    InvalidId(String),

    #[error("Invalid role: {0}. Valid roles: client, collaborator, admin")]
    InvalidRole(String),

    #[error("No profile with ID {0}")]
    NotFound(UserId),

    #[error("User {0} is already {1}")]
    AlreadyInRole(UserId, Role),

    /// Only upgrades are allowed.
    #[error("Cannot change {0} to {1}")]
    Downgrade(Role, Role),
}

fn parse_role(role: &str) -> Result<Role, UserError> {
    role.parse()
        .map_err(|_| UserError::InvalidRole(role.to_owned()))
}

const fn rank(role: Role) -> u8 {
    match role {
        Role::Client => 0,
        Role::Collaborator => 1,
        Role::Admin => 2,
    }
}

/// Raise a user's role to `to` (`collaborator` or `admin`).
///
/// # Errors
///
/// Returns `UserError` for bad input, unknown users, downgrades, or if the
/// role changed while the command ran.
pub async fn promote(id: &str, to: &str) -> Result<(), UserError> {
    let id: UserId = id
        .parse()
        .map_err(|_| UserError::InvalidId(id.to_owned()))?;
    let target = parse_role(to)?;

    let pool = connect().await?;
    let profiles = ProfileRepository::new(&pool);

    let profile = profiles.get(id).await?.ok_or(UserError::NotFound(id))?;
    if profile.role == target {
        return Err(UserError::AlreadyInRole(id, target));
    }
    if rank(target) < rank(profile.role) {
        return Err(UserError::Downgrade(profile.role, target));
    }

    let updated = profiles.update_role(id, profile.role, target).await?;
    tracing::info!(
        "Promoted {} <{}> from {} to {}",
        updated.name,
        updated.email,
        profile.role,
        updated.role
    );
    Ok(())
}

/// Print every profile with `role`, ordered by name.
///
/// # Errors
///
/// Returns `UserError` for an unknown role or a database failure.
pub async fn list(role: &str) -> Result<(), UserError> {
    let role = parse_role(role)?;

    let pool = connect().await?;
    let profiles = ProfileRepository::new(&pool).list_by_role(role).await?;

    #[allow(clippy::print_stdout)]
    {
        for profile in &profiles {
            println!("{}\t{}\t{}", profile.id, profile.name, profile.email);
        }
    }
    tracing::info!("{} {} profile(s)", profiles.len(), role);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_rank_upwards() {
        assert!(rank(Role::Client) < rank(Role::Collaborator));
        assert!(rank(Role::Collaborator) < rank(Role::Admin));
    }

    #[test]
    fn test_parse_role_rejects_unknown() {
        assert!(matches!(parse_role("owner"), Err(UserError::InvalidRole(_))));
        assert!(matches!(parse_role("collaborator"), Ok(Role::Collaborator)));
    }
}
