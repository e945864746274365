//! [`Store`] backed by `PostgreSQL`.

use async_trait::async_trait;
use sqlx::PgPool;

use fixflow_core::messaging::DirectChannel;
use fixflow_core::{
    AgendaItem, AgendaItemId, ChatMessage, NewChatMessage, NewProfile, NewServiceRequest, Profile,
    ProfileUpdate, Quote, RequestId, Role, ServiceRequest, UserId,
};

use super::{
    MessageRepository, MessageStore, ProfileRepository, ProfileStore, RepositoryError,
    RequestFilter, RequestRepository, RequestStore, RespondCommand, ScheduleCommand, Store,
};

/// Production store: thin adapter from the store traits to the repositories.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    const fn profiles(&self) -> ProfileRepository<'_> {
        ProfileRepository::new(&self.pool)
    }

    const fn requests(&self) -> RequestRepository<'_> {
        RequestRepository::new(&self.pool)
    }

    const fn messages(&self) -> MessageRepository<'_> {
        MessageRepository::new(&self.pool)
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn get_profile(&self, id: UserId) -> Result<Option<Profile>, RepositoryError> {
        self.profiles().get(id).await
    }

    async fn list_profiles_by_role(&self, role: Role) -> Result<Vec<Profile>, RepositoryError> {
        self.profiles().list_by_role(role).await
    }

    async fn first_admin(&self) -> Result<Option<Profile>, RepositoryError> {
        self.profiles().first_admin().await
    }

    async fn create_profile(&self, profile: &NewProfile) -> Result<Profile, RepositoryError> {
        self.profiles().create(profile).await
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<Profile, RepositoryError> {
        self.profiles().update(id, update).await
    }

    async fn update_role(
        &self,
        id: UserId,
        expected: Role,
        role: Role,
    ) -> Result<Profile, RepositoryError> {
        self.profiles().update_role(id, expected, role).await
    }

    async fn delete_profile(&self, id: UserId) -> Result<(), RepositoryError> {
        self.profiles().delete(id).await
    }
}

#[async_trait]
impl RequestStore for PgStore {
    async fn create_request(
        &self,
        request: &NewServiceRequest,
    ) -> Result<ServiceRequest, RepositoryError> {
        self.requests().create(request).await
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<ServiceRequest>, RepositoryError> {
        self.requests().get(id).await
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<ServiceRequest>, RepositoryError> {
        self.requests().list(filter).await
    }

    async fn get_quote(&self, request_id: RequestId) -> Result<Option<Quote>, RepositoryError> {
        self.requests().get_quote(request_id).await
    }

    async fn respond(
        &self,
        command: &RespondCommand,
    ) -> Result<(ServiceRequest, Quote), RepositoryError> {
        self.requests().respond(command).await
    }

    async fn accept_quote(
        &self,
        request_id: RequestId,
        client: UserId,
    ) -> Result<ServiceRequest, RepositoryError> {
        self.requests().accept_quote(request_id, client).await
    }

    async fn schedule(
        &self,
        command: &ScheduleCommand,
    ) -> Result<(ServiceRequest, AgendaItem), RepositoryError> {
        self.requests().schedule(command).await
    }

    async fn get_agenda_item(
        &self,
        id: AgendaItemId,
    ) -> Result<Option<AgendaItem>, RepositoryError> {
        self.requests().get_agenda_item(id).await
    }

    async fn list_agenda(&self, collaborator: UserId) -> Result<Vec<AgendaItem>, RepositoryError> {
        self.requests().list_agenda(collaborator).await
    }

    async fn complete(
        &self,
        item: AgendaItemId,
        collaborator: UserId,
    ) -> Result<(ServiceRequest, AgendaItem), RepositoryError> {
        self.requests().complete(item, collaborator).await
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn append_message(
        &self,
        message: &NewChatMessage,
    ) -> Result<ChatMessage, RepositoryError> {
        self.messages().append(message).await
    }

    async fn request_thread(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.messages().request_thread(request_id).await
    }

    async fn direct_messages(
        &self,
        sender: UserId,
        recipient: UserId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.messages().direct(sender, recipient).await
    }

    async fn direct_thread(
        &self,
        channel: DirectChannel,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.messages().direct_thread(channel).await
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
