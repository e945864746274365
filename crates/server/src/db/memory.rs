//! In-process [`Store`].
//!
//! All state sits behind one `RwLock`; each lifecycle write re-checks its
//! precondition and applies every row change inside a single write-lock
//! critical section, which gives the same all-or-nothing compare-and-set
//! behavior as the `PostgreSQL` transactions.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use fixflow_core::{
    AgendaItem, AgendaItemId, ChatMessage, ChatMessageId, NewChatMessage, NewProfile,
    NewServiceRequest, Profile, ProfileUpdate, Quote, QuoteId, RequestId, RequestStatus, Role,
    ServiceRequest, UserId,
};

use super::{
    MessageStore, ProfileStore, RepositoryError, RequestFilter, RequestStore, RespondCommand,
    ScheduleCommand, Store,
};

#[derive(Debug, Default)]
struct Inner {
    profiles: HashMap<UserId, Profile>,
    requests: BTreeMap<RequestId, ServiceRequest>,
    quotes: HashMap<RequestId, Quote>,
    agenda: BTreeMap<AgendaItemId, AgendaItem>,
    messages: Vec<ChatMessage>,
    last_id: i64,
}

impl Inner {
    const fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn conflict(request_id: RequestId, what: &str) -> RepositoryError {
        RepositoryError::Conflict(format!(
            "request {request_id} changed before it could be {what}"
        ))
    }

    /// Copy of a stored message with the sender's current role filled in.
    fn with_sender_role(&self, message: &ChatMessage) -> ChatMessage {
        ChatMessage {
            sender_role: self.profiles.get(&message.sender_id).map(|p| p.role),
            ..message.clone()
        }
    }
}

/// Store that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, id: UserId) -> Result<Option<Profile>, RepositoryError> {
        Ok(self.inner.read().await.profiles.get(&id).cloned())
    }

    async fn list_profiles_by_role(&self, role: Role) -> Result<Vec<Profile>, RepositoryError> {
        let inner = self.inner.read().await;
        let mut list: Vec<Profile> = inner
            .profiles
            .values()
            .filter(|p| p.role == role)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(list)
    }

    async fn first_admin(&self) -> Result<Option<Profile>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .profiles
            .values()
            .filter(|p| p.role == Role::Admin)
            .min_by_key(|p| (p.created_at, p.id))
            .cloned())
    }

    async fn create_profile(&self, profile: &NewProfile) -> Result<Profile, RepositoryError> {
        let mut inner = self.inner.write().await;
        if inner.profiles.contains_key(&profile.id)
            || inner.profiles.values().any(|p| p.email == profile.email)
        {
            return Err(RepositoryError::Conflict("profile already exists".to_owned()));
        }

        let now = Utc::now();
        let created = Profile {
            id: profile.id,
            role: profile.role,
            name: profile.name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            address: profile.address.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.profiles.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<Profile, RepositoryError> {
        let mut inner = self.inner.write().await;
        let profile = inner
            .profiles
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;

        if let Some(name) = &update.name {
            profile.name.clone_from(name);
        }
        if let Some(address) = &update.address {
            profile.address.clone_from(address);
        }
        if let Some(phone) = &update.phone {
            profile.phone.clone_from(phone);
        }
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn update_role(
        &self,
        id: UserId,
        expected: Role,
        role: Role,
    ) -> Result<Profile, RepositoryError> {
        let mut inner = self.inner.write().await;
        let profile = inner
            .profiles
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;

        if profile.role != expected {
            return Err(RepositoryError::Conflict(format!(
                "profile {id} is no longer a {expected}"
            )));
        }
        profile.role = role;
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn delete_profile(&self, id: UserId) -> Result<(), RepositoryError> {
        self.inner
            .write()
            .await
            .profiles
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn create_request(
        &self,
        request: &NewServiceRequest,
    ) -> Result<ServiceRequest, RepositoryError> {
        let mut inner = self.inner.write().await;
        let created = ServiceRequest {
            id: RequestId::new(inner.next_id()),
            client_id: request.client_id,
            client_name: request.client_name.clone(),
            assigned_collaborator_id: None,
            collaborator_name: None,
            description: request.description.clone(),
            priority: request.priority,
            status: RequestStatus::Pending,
            photos: request.photos.clone(),
            created_at: Utc::now(),
            responded_at: None,
            execution_date: None,
            completed_at: None,
        };
        inner.requests.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<ServiceRequest>, RepositoryError> {
        Ok(self.inner.read().await.requests.get(&id).cloned())
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<ServiceRequest>, RepositoryError> {
        let inner = self.inner.read().await;
        let mut list: Vec<ServiceRequest> = inner
            .requests
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(list)
    }

    async fn get_quote(&self, request_id: RequestId) -> Result<Option<Quote>, RepositoryError> {
        Ok(self.inner.read().await.quotes.get(&request_id).cloned())
    }

    async fn respond(
        &self,
        command: &RespondCommand,
    ) -> Result<(ServiceRequest, Quote), RepositoryError> {
        let mut inner = self.inner.write().await;

        let claimable = inner.requests.get(&command.request_id).is_some_and(|r| {
            r.status == RequestStatus::Pending && !r.is_claimed()
        });
        if !claimable || inner.quotes.contains_key(&command.request_id) {
            return Err(Inner::conflict(command.request_id, "claimed"));
        }

        let now = Utc::now();
        let quote = Quote {
            id: QuoteId::new(inner.next_id()),
            request_id: command.request_id,
            collaborator_id: command.collaborator_id,
            price: command.terms.price,
            labor_description: command.terms.labor_description.clone(),
            materials_list: command.terms.materials_list.clone(),
            suggested_execution_date: command.terms.suggested_execution_date,
            created_at: now,
        };

        let request = inner
            .requests
            .get_mut(&command.request_id)
            .ok_or(RepositoryError::NotFound)?;
        request.status = RequestStatus::Responded;
        request.assigned_collaborator_id = Some(command.collaborator_id);
        request.collaborator_name = Some(command.collaborator_name.clone());
        request.responded_at = Some(now);
        let request = request.clone();

        inner.quotes.insert(command.request_id, quote.clone());
        Ok((request, quote))
    }

    async fn accept_quote(
        &self,
        request_id: RequestId,
        client: UserId,
    ) -> Result<ServiceRequest, RepositoryError> {
        let mut inner = self.inner.write().await;
        let request = inner
            .requests
            .get_mut(&request_id)
            .filter(|r| r.status == RequestStatus::Responded && r.client_id == client)
            .ok_or_else(|| Inner::conflict(request_id, "accepted"))?;

        request.status = RequestStatus::ClosedByClient;
        Ok(request.clone())
    }

    async fn schedule(
        &self,
        command: &ScheduleCommand,
    ) -> Result<(ServiceRequest, AgendaItem), RepositoryError> {
        let mut inner = self.inner.write().await;

        let applies = inner.requests.get(&command.request_id).is_some_and(|r| {
            r.status == command.expected && r.is_assigned_to(command.collaborator_id)
        });
        if !applies {
            return Err(Inner::conflict(command.request_id, "scheduled"));
        }

        let existing = inner
            .agenda
            .values()
            .find(|item| item.request_id == command.request_id)
            .map(|item| item.id);
        let item = match existing {
            Some(id) => {
                let item = inner.agenda.get_mut(&id).ok_or(RepositoryError::NotFound)?;
                item.execution_datetime = command.at;
                item.status = RequestStatus::Scheduled;
                item.clone()
            }
            None => {
                let item = AgendaItem {
                    id: AgendaItemId::new(inner.next_id()),
                    collaborator_id: command.collaborator_id,
                    request_id: command.request_id,
                    client_name: command.seed.client_name.clone(),
                    client_address: command.seed.client_address.clone(),
                    description: command.seed.description.clone(),
                    execution_datetime: command.at,
                    status: RequestStatus::Scheduled,
                };
                inner.agenda.insert(item.id, item.clone());
                item
            }
        };

        let request = inner
            .requests
            .get_mut(&command.request_id)
            .ok_or(RepositoryError::NotFound)?;
        request.status = RequestStatus::Scheduled;
        request.execution_date = Some(command.at);

        Ok((request.clone(), item))
    }

    async fn get_agenda_item(
        &self,
        id: AgendaItemId,
    ) -> Result<Option<AgendaItem>, RepositoryError> {
        Ok(self.inner.read().await.agenda.get(&id).cloned())
    }

    async fn list_agenda(&self, collaborator: UserId) -> Result<Vec<AgendaItem>, RepositoryError> {
        let inner = self.inner.read().await;
        let mut list: Vec<AgendaItem> = inner
            .agenda
            .values()
            .filter(|item| item.collaborator_id == collaborator)
            .cloned()
            .collect();
        list.sort_by_key(|item| (item.execution_datetime, item.id));
        Ok(list)
    }

    async fn complete(
        &self,
        item_id: AgendaItemId,
        collaborator: UserId,
    ) -> Result<(ServiceRequest, AgendaItem), RepositoryError> {
        let mut inner = self.inner.write().await;

        let request_id = inner
            .agenda
            .get(&item_id)
            .filter(|item| {
                item.collaborator_id == collaborator && item.status == RequestStatus::Scheduled
            })
            .map(|item| item.request_id)
            .ok_or_else(|| {
                RepositoryError::Conflict(format!("agenda item {item_id} is no longer scheduled"))
            })?;

        let applies = inner.requests.get(&request_id).is_some_and(|r| {
            r.status == RequestStatus::Scheduled && r.is_assigned_to(collaborator)
        });
        if !applies {
            return Err(Inner::conflict(request_id, "completed"));
        }

        let request = inner
            .requests
            .get_mut(&request_id)
            .ok_or(RepositoryError::NotFound)?;
        request.status = RequestStatus::Completed;
        request.completed_at = Some(Utc::now());
        let request = request.clone();

        let item = inner
            .agenda
            .get_mut(&item_id)
            .ok_or(RepositoryError::NotFound)?;
        item.status = RequestStatus::Completed;

        Ok((request, item.clone()))
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append_message(
        &self,
        message: &NewChatMessage,
    ) -> Result<ChatMessage, RepositoryError> {
        let mut inner = self.inner.write().await;
        let stored = ChatMessage {
            id: ChatMessageId::new(inner.next_id()),
            request_id: message.addressing.request_id(),
            sender_id: message.sender_id,
            sender_name: message.sender_name.clone(),
            sender_role: None,
            recipient_id: message.addressing.recipient_id(),
            message: message.message.clone(),
            created_at: Utc::now(),
        };
        inner.messages.push(stored.clone());
        Ok(inner.with_sender_role(&stored))
    }

    async fn request_thread(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let inner = self.inner.read().await;
        let mut thread: Vec<ChatMessage> = inner
            .messages
            .iter()
            .filter(|m| m.request_id == Some(request_id))
            .map(|m| inner.with_sender_role(m))
            .collect();
        fixflow_core::messaging::sort_thread(&mut thread);
        Ok(thread)
    }

    async fn direct_messages(
        &self,
        sender: UserId,
        recipient: UserId,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let inner = self.inner.read().await;
        let mut thread: Vec<ChatMessage> = inner
            .messages
            .iter()
            .filter(|m| {
                m.request_id.is_none()
                    && m.sender_id == sender
                    && m.recipient_id == Some(recipient)
            })
            .map(|m| inner.with_sender_role(m))
            .collect();
        fixflow_core::messaging::sort_thread(&mut thread);
        Ok(thread)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
