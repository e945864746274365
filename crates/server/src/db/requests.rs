//! Database operations for service requests, quotes and agenda items.
//!
//! Lifecycle writes are conditional updates: the `WHERE` clause repeats the
//! guard the service evaluated, and zero affected rows means another writer
//! got there first. Satellite rows (quote, agenda item) are written in the
//! same transaction so a lost race leaves nothing behind.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use fixflow_core::{
    AgendaItem, AgendaItemId, NewServiceRequest, Price, Priority, Quote, QuoteId, RequestId,
    RequestStatus, ServiceRequest, UserId,
};

use super::{RepositoryError, RequestFilter, RespondCommand, ScheduleCommand};

// =============================================================================
// Internal Row Types
// =============================================================================

const REQUEST_COLUMNS: &str = "id, client_id, client_name, assigned_collaborator_id, \
     collaborator_name, description, priority, status, photos, created_at, responded_at, \
     execution_date, completed_at";

const QUOTE_COLUMNS: &str = "id, request_id, collaborator_id, price, labor_description, \
     materials_list, suggested_execution_date, created_at";

const AGENDA_COLUMNS: &str = "id, collaborator_id, request_id, client_name, client_address, \
     description, execution_datetime, status";

#[derive(Debug, sqlx::FromRow)]
struct RequestRow {
    id: i64,
    client_id: Uuid,
    client_name: String,
    assigned_collaborator_id: Option<Uuid>,
    collaborator_name: Option<String>,
    description: String,
    priority: Priority,
    status: RequestStatus,
    photos: Vec<String>,
    created_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
    execution_date: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<RequestRow> for ServiceRequest {
    type Error = RepositoryError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let request = Self {
            id: RequestId::new(row.id),
            client_id: UserId::new(row.client_id),
            client_name: row.client_name,
            assigned_collaborator_id: row.assigned_collaborator_id.map(UserId::new),
            collaborator_name: row.collaborator_name,
            description: row.description,
            priority: row.priority,
            status: row.status,
            photos: row.photos,
            created_at: row.created_at,
            responded_at: row.responded_at,
            execution_date: row.execution_date,
            completed_at: row.completed_at,
        };

        if let Some(violation) = request.invariant_violation() {
            return Err(RepositoryError::DataCorruption(format!(
                "request {}: {violation}",
                request.id
            )));
        }

        Ok(request)
    }
}

#[derive(Debug, sqlx::FromRow)]
struct QuoteRow {
    id: i64,
    request_id: i64,
    collaborator_id: Uuid,
    price: Decimal,
    labor_description: String,
    materials_list: String,
    suggested_execution_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<QuoteRow> for Quote {
    type Error = RepositoryError;

    fn try_from(row: QuoteRow) -> Result<Self, Self::Error> {
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("quote {}: {e}", row.id))
        })?;

        Ok(Self {
            id: QuoteId::new(row.id),
            request_id: RequestId::new(row.request_id),
            collaborator_id: UserId::new(row.collaborator_id),
            price,
            labor_description: row.labor_description,
            materials_list: row.materials_list,
            suggested_execution_date: row.suggested_execution_date,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AgendaRow {
    id: i64,
    collaborator_id: Uuid,
    request_id: i64,
    client_name: String,
    client_address: String,
    description: String,
    execution_datetime: DateTime<Utc>,
    status: RequestStatus,
}

impl From<AgendaRow> for AgendaItem {
    fn from(row: AgendaRow) -> Self {
        Self {
            id: AgendaItemId::new(row.id),
            collaborator_id: UserId::new(row.collaborator_id),
            request_id: RequestId::new(row.request_id),
            client_name: row.client_name,
            client_address: row.client_address,
            description: row.description,
            execution_datetime: row.execution_datetime,
            status: row.status,
        }
    }
}

fn lost_race(request_id: RequestId, what: &str) -> RepositoryError {
    RepositoryError::Conflict(format!("request {request_id} changed before it could be {what}"))
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for service request database operations.
pub struct RequestRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RequestRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new pending request.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        request: &NewServiceRequest,
    ) -> Result<ServiceRequest, RepositoryError> {
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            "INSERT INTO service_requests (client_id, client_name, description, priority, photos)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(request.client_id)
        .bind(&request.client_name)
        .bind(&request.description)
        .bind(request.priority)
        .bind(&request.photos)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Get a request by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: RequestId) -> Result<Option<ServiceRequest>, RepositoryError> {
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM service_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List requests matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<ServiceRequest>, RepositoryError> {
        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM service_requests
             WHERE ($1::uuid IS NULL OR client_id = $1)
               AND ($2::uuid IS NULL OR assigned_collaborator_id = $2)
               AND ($3::request_status IS NULL OR status = $3)
               AND (NOT $4 OR assigned_collaborator_id IS NULL)
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(filter.client_id)
        .bind(filter.assigned_to)
        .bind(filter.status)
        .bind(filter.unclaimed)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get the quote for a request.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_quote(&self, request_id: RequestId) -> Result<Option<Quote>, RepositoryError> {
        let row = sqlx::query_as::<_, QuoteRow>(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes WHERE request_id = $1"
        ))
        .bind(request_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Claim a pending request and store the quote, atomically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the request was claimed or moved
    /// on before this write.
    pub async fn respond(
        &self,
        command: &RespondCommand,
    ) -> Result<(ServiceRequest, Quote), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let request = sqlx::query_as::<_, RequestRow>(&format!(
            "UPDATE service_requests
             SET status = 'responded',
                 assigned_collaborator_id = $2,
                 collaborator_name = $3,
                 responded_at = now()
             WHERE id = $1 AND status = 'pending' AND assigned_collaborator_id IS NULL
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(command.request_id)
        .bind(command.collaborator_id)
        .bind(&command.collaborator_name)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| lost_race(command.request_id, "claimed"))?;

        let quote = sqlx::query_as::<_, QuoteRow>(&format!(
            "INSERT INTO quotes
                 (request_id, collaborator_id, price, labor_description, materials_list,
                  suggested_execution_date)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {QUOTE_COLUMNS}"
        ))
        .bind(command.request_id)
        .bind(command.collaborator_id)
        .bind(command.terms.price.amount())
        .bind(&command.terms.labor_description)
        .bind(&command.terms.materials_list)
        .bind(command.terms.suggested_execution_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| super::conflict_on_unique(e, "quote"))?;

        tx.commit().await?;

        Ok((request.try_into()?, quote.try_into()?))
    }

    /// Accept the quote on a responded request owned by `client`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the request is no longer responded.
    pub async fn accept_quote(
        &self,
        request_id: RequestId,
        client: UserId,
    ) -> Result<ServiceRequest, RepositoryError> {
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            "UPDATE service_requests SET status = 'closed_by_client'
             WHERE id = $1 AND status = 'responded' AND client_id = $2
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(request_id)
        .bind(client)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| lost_race(request_id, "accepted"))?;

        row.try_into()
    }

    /// Schedule or reschedule a visit.
    ///
    /// The agenda item is upserted on its `request_id` key: created the first
    /// time, moved in place afterwards.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the request left the expected
    /// status or changed assignee.
    pub async fn schedule(
        &self,
        command: &ScheduleCommand,
    ) -> Result<(ServiceRequest, AgendaItem), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let request = sqlx::query_as::<_, RequestRow>(&format!(
            "UPDATE service_requests SET status = 'scheduled', execution_date = $3
             WHERE id = $1 AND assigned_collaborator_id = $2 AND status = $4
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(command.request_id)
        .bind(command.collaborator_id)
        .bind(command.at)
        .bind(command.expected)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| lost_race(command.request_id, "scheduled"))?;

        let item = sqlx::query_as::<_, AgendaRow>(&format!(
            "INSERT INTO agenda_items
                 (collaborator_id, request_id, client_name, client_address, description,
                  execution_datetime, status)
             VALUES ($1, $2, $3, $4, $5, $6, 'scheduled')
             ON CONFLICT (request_id) DO UPDATE
                 SET execution_datetime = EXCLUDED.execution_datetime,
                     status = 'scheduled'
             RETURNING {AGENDA_COLUMNS}"
        ))
        .bind(command.collaborator_id)
        .bind(command.request_id)
        .bind(&command.seed.client_name)
        .bind(&command.seed.client_address)
        .bind(&command.seed.description)
        .bind(command.at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((request.try_into()?, item.into()))
    }

    /// Get an agenda item by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_agenda_item(
        &self,
        id: AgendaItemId,
    ) -> Result<Option<AgendaItem>, RepositoryError> {
        let row = sqlx::query_as::<_, AgendaRow>(&format!(
            "SELECT {AGENDA_COLUMNS} FROM agenda_items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// List a collaborator's agenda, soonest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_agenda(&self, collaborator: UserId) -> Result<Vec<AgendaItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, AgendaRow>(&format!(
            "SELECT {AGENDA_COLUMNS} FROM agenda_items
             WHERE collaborator_id = $1
             ORDER BY execution_datetime, id"
        ))
        .bind(collaborator)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Complete a scheduled visit and its request together.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if either row is no longer scheduled
    /// for `collaborator`.
    pub async fn complete(
        &self,
        item_id: AgendaItemId,
        collaborator: UserId,
    ) -> Result<(ServiceRequest, AgendaItem), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let item = sqlx::query_as::<_, AgendaRow>(&format!(
            "UPDATE agenda_items SET status = 'completed'
             WHERE id = $1 AND collaborator_id = $2 AND status = 'scheduled'
             RETURNING {AGENDA_COLUMNS}"
        ))
        .bind(item_id)
        .bind(collaborator)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            RepositoryError::Conflict(format!("agenda item {item_id} is no longer scheduled"))
        })?;

        let request_id = RequestId::new(item.request_id);
        let request = sqlx::query_as::<_, RequestRow>(&format!(
            "UPDATE service_requests SET status = 'completed', completed_at = now()
             WHERE id = $1 AND status = 'scheduled' AND assigned_collaborator_id = $2
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(request_id)
        .bind(collaborator)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| lost_race(request_id, "completed"))?;

        tx.commit().await?;

        Ok((request.try_into()?, item.into()))
    }
}
