//! Database operations for user profiles.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use fixflow_core::{Email, NewProfile, Profile, ProfileUpdate, Role, UserId};

use super::{RepositoryError, conflict_on_unique};

// =============================================================================
// Internal Row Types
// =============================================================================

const PROFILE_COLUMNS: &str = "id, role, name, email, phone, address, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    role: Role,
    name: String,
    email: String,
    phone: String,
    address: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email for profile {}: {e}", row.id))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            role: row.role,
            name: row.name,
            email,
            phone: row.phone,
            address: row.address,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for profile database operations.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a profile by user ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: UserId) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List profiles with a role, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_role(&self, role: Role) -> Result<Vec<Profile>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE role = $1 ORDER BY name, id"
        ))
        .bind(role)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// The earliest-created admin.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn first_admin(&self) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE role = 'admin'
             ORDER BY created_at, id LIMIT 1"
        ))
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Insert a new profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the ID or email is taken.
    pub async fn create(&self, profile: &NewProfile) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "INSERT INTO profiles (id, role, name, email, phone, address)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(profile.id)
        .bind(profile.role)
        .bind(&profile.name)
        .bind(profile.email.as_str())
        .bind(&profile.phone)
        .bind(&profile.address)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "profile"))?;

        row.try_into()
    }

    /// Apply a self-service profile update. Unset fields are left alone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile doesn't exist.
    pub async fn update(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "UPDATE profiles
             SET name = COALESCE($2, name),
                 address = COALESCE($3, address),
                 phone = COALESCE($4, phone),
                 updated_at = now()
             WHERE id = $1
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(id)
        .bind(update.name.as_deref())
        .bind(update.address.as_deref())
        .bind(update.phone.as_deref())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Change a profile's role if it still has `expected`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile doesn't exist and
    /// `RepositoryError::Conflict` if its role changed underneath.
    pub async fn update_role(
        &self,
        id: UserId,
        expected: Role,
        role: Role,
    ) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "UPDATE profiles SET role = $3, updated_at = now()
             WHERE id = $1 AND role = $2
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(id)
        .bind(expected)
        .bind(role)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None if self.get(id).await?.is_some() => Err(RepositoryError::Conflict(format!(
                "profile {id} is no longer a {expected}"
            ))),
            None => Err(RepositoryError::NotFound),
        }
    }

    /// Delete a profile row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile doesn't exist.
    pub async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
