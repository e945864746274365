//! Profile management: the current user's own profile and admin user
//! administration.

use serde::Deserialize;
use tracing::{info, instrument};

use fixflow_core::validation::required;
use fixflow_core::{LifecycleError, NewProfile, Profile, ProfileUpdate, Role, UserId};

use super::{IdentityUser, ServiceError, found};
use crate::db::Store;

/// Profile details collected at sign-up.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignUpDetails {
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

/// Reads and updates profiles.
pub struct ProfileService<'a> {
    store: &'a dyn Store,
}

impl<'a> ProfileService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    fn require_admin(actor: &Profile) -> Result<(), ServiceError> {
        if actor.role == Role::Admin {
            Ok(())
        } else {
            Err(LifecycleError::Forbidden("administrators only").into())
        }
    }

    /// Create the client profile of a freshly signed-up user.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank name.
    /// - `Repository(Conflict)` if the user already has a profile.
    #[instrument(skip(self, user, details), fields(user_id = %user.id))]
    pub async fn register(
        &self,
        user: &IdentityUser,
        details: &SignUpDetails,
    ) -> Result<Profile, ServiceError> {
        let profile = NewProfile {
            id: user.id,
            role: Role::Client,
            name: required("name", &details.name)?,
            email: user.email.clone(),
            phone: details.phone.trim().to_owned(),
            address: details.address.trim().to_owned(),
        };
        let profile = self.store.create_profile(&profile).await?;

        info!("Client profile created");
        Ok(profile)
    }

    /// Check `details` before the identity provider is called.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank name.
    pub fn validate_sign_up(details: &SignUpDetails) -> Result<(), ServiceError> {
        required("name", &details.name)?;
        Ok(())
    }

    /// The profile of `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the profile is gone.
    pub async fn me(&self, id: UserId) -> Result<Profile, ServiceError> {
        found(self.store.get_profile(id).await?, "profile")
    }

    /// Update `id`'s name, address or phone.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty update or a blank name.
    /// - `NotFound` if the profile is gone.
    #[instrument(skip(self, update), fields(user_id = %id))]
    pub async fn update_me(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<Profile, ServiceError> {
        if update.is_empty() {
            return Err(fixflow_core::ValidationError::Required {
                field: "name, address or phone",
            }
            .into());
        }

        let update = ProfileUpdate {
            name: update.name.as_deref().map(|n| required("name", n)).transpose()?,
            address: update.address.map(|a| a.trim().to_owned()),
            phone: update.phone.map(|p| p.trim().to_owned()),
        };

        Ok(self.store.update_profile(id, &update).await?)
    }

    /// Profiles with `role`, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` unless `admin` is an admin.
    pub async fn list_users(&self, admin: &Profile, role: Role) -> Result<Vec<Profile>, ServiceError> {
        Self::require_admin(admin)?;
        Ok(self.store.list_profiles_by_role(role).await?)
    }

    /// Make a client a collaborator.
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless `admin` is an admin.
    /// - `Repository(NotFound)` for an unknown user.
    /// - `Repository(Conflict)` if the user is not currently a client.
    #[instrument(skip(self, admin), fields(actor = %admin.id))]
    pub async fn promote(&self, admin: &Profile, user_id: UserId) -> Result<Profile, ServiceError> {
        Self::require_admin(admin)?;
        let profile = self
            .store
            .update_role(user_id, Role::Client, Role::Collaborator)
            .await?;

        info!(user_id = %user_id, "User promoted to collaborator");
        Ok(profile)
    }

    /// Delete a user's profile row. Their requests and messages stay.
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless `admin` is an admin other than the target.
    /// - `Repository(NotFound)` for an unknown user.
    #[instrument(skip(self, admin), fields(actor = %admin.id))]
    pub async fn delete_user(&self, admin: &Profile, user_id: UserId) -> Result<(), ServiceError> {
        Self::require_admin(admin)?;
        if admin.id == user_id {
            return Err(LifecycleError::Forbidden("administrators cannot delete themselves").into());
        }

        self.store.delete_profile(user_id).await?;
        info!(user_id = %user_id, "Profile deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fixflow_core::{Email, ValidationError};

    use super::*;
    use crate::db::{MemoryStore, RepositoryError};
    use crate::services::testing::profile;

    #[tokio::test]
    async fn test_register_creates_client() {
        let store = MemoryStore::new();
        let service = ProfileService::new(&store);
        let user = IdentityUser {
            id: UserId::random(),
            email: Email::parse("carla@fixflow.test").unwrap(),
        };

        let created = service
            .register(&user, &SignUpDetails {
                name: "  Carla ".to_owned(),
                phone: "555-0100".to_owned(),
                address: "Rua A, 1".to_owned(),
            })
            .await
            .unwrap();

        assert_eq!(created.role, Role::Client);
        assert_eq!(created.name, "Carla");
        assert_eq!(service.me(user.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_update_me() {
        let store = MemoryStore::new();
        let carla = profile(&store, Role::Client, "Carla").await;
        let service = ProfileService::new(&store);

        let updated = service
            .update_me(carla.id, ProfileUpdate {
                address: Some(" Rua B, 2 ".to_owned()),
                ..ProfileUpdate::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.address, "Rua B, 2");
        assert_eq!(updated.name, "Carla");

        assert!(matches!(
            service
                .update_me(carla.id, ProfileUpdate {
                    name: Some("   ".to_owned()),
                    ..ProfileUpdate::default()
                })
                .await,
            Err(ServiceError::Validation(ValidationError::Required { field: "name" }))
        ));
        assert!(matches!(
            service.update_me(carla.id, ProfileUpdate::default()).await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_promote_is_admin_only_and_once() {
        let store = MemoryStore::new();
        let admin = profile(&store, Role::Admin, "Ana").await;
        let carla = profile(&store, Role::Client, "Carla").await;
        let service = ProfileService::new(&store);

        assert!(matches!(
            service.promote(&carla, carla.id).await,
            Err(ServiceError::Lifecycle(LifecycleError::Forbidden(_)))
        ));

        let promoted = service.promote(&admin, carla.id).await.unwrap();
        assert_eq!(promoted.role, Role::Collaborator);

        assert!(matches!(
            service.promote(&admin, carla.id).await,
            Err(ServiceError::Repository(RepositoryError::Conflict(_)))
        ));
        assert_eq!(
            service
                .list_users(&admin, Role::Collaborator)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_delete_user() {
        let store = MemoryStore::new();
        let admin = profile(&store, Role::Admin, "Ana").await;
        let carla = profile(&store, Role::Client, "Carla").await;
        let service = ProfileService::new(&store);

        assert!(matches!(
            service.delete_user(&admin, admin.id).await,
            Err(ServiceError::Lifecycle(LifecycleError::Forbidden(_)))
        ));
        service.delete_user(&admin, carla.id).await.unwrap();
        assert!(matches!(
            service.me(carla.id).await,
            Err(ServiceError::NotFound("profile"))
        ));
        assert!(matches!(
            service.delete_user(&admin, carla.id).await,
            Err(ServiceError::Repository(RepositoryError::NotFound))
        ));
    }
}
