//! Request threads and direct messages with the administrator.

use tracing::{debug, instrument};

use fixflow_core::messaging::{Addressing, DirectChannel};
use fixflow_core::visibility::ensure_can_view;
use fixflow_core::{Actor, ChatMessage, NewChatMessage, Profile, RequestId, UserId};

use super::{ServiceError, found};
use crate::db::Store;

/// Sends and reads chat messages.
pub struct MessagingService<'a> {
    store: &'a dyn Store,
}

impl<'a> MessagingService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    async fn visible_request(&self, user: &Profile, id: RequestId) -> Result<(), ServiceError> {
        let request = found(self.store.get_request(id).await?, "request")?;
        ensure_can_view(&request, &Actor::from(user))?;
        Ok(())
    }

    async fn channel_with(
        &self,
        user: &Profile,
        other: UserId,
    ) -> Result<DirectChannel, ServiceError> {
        let other = found(self.store.get_profile(other).await?, "user")?;
        Ok(DirectChannel::between(
            &Actor::from(user),
            &Actor::from(&other),
        )?)
    }

    /// Post to a request thread. Only users who can see the request may post.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown request.
    /// - `Forbidden` when `sender` cannot see the request.
    /// - `Validation` for blank or oversized text.
    #[instrument(skip(self, sender, text), fields(actor = %sender.id))]
    pub async fn send_request_message(
        &self,
        sender: &Profile,
        request_id: RequestId,
        text: &str,
    ) -> Result<ChatMessage, ServiceError> {
        self.visible_request(sender, request_id).await?;
        let message = NewChatMessage::compose(Addressing::Request(request_id), sender, text)?;
        let stored = self.store.append_message(&message).await?;
        debug!(message_id = %stored.id, "Request message sent");
        Ok(stored)
    }

    /// The messages on a request thread, oldest first.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown request.
    /// - `Forbidden` when `reader` cannot see the request.
    #[instrument(skip(self, reader), fields(actor = %reader.id))]
    pub async fn request_thread(
        &self,
        reader: &Profile,
        request_id: RequestId,
    ) -> Result<Vec<ChatMessage>, ServiceError> {
        self.visible_request(reader, request_id).await?;
        Ok(self.store.request_thread(request_id).await?)
    }

    /// Send a direct message. One of the two users must be an admin.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown recipient.
    /// - `Validation` when addressed to oneself or the text is unusable.
    /// - `Forbidden` when neither side is an admin.
    #[instrument(skip(self, sender, text), fields(actor = %sender.id))]
    pub async fn send_direct_message(
        &self,
        sender: &Profile,
        recipient: UserId,
        text: &str,
    ) -> Result<ChatMessage, ServiceError> {
        self.channel_with(sender, recipient).await?;
        let message = NewChatMessage::compose(Addressing::Direct { recipient }, sender, text)?;
        let stored = self.store.append_message(&message).await?;
        debug!(message_id = %stored.id, "Direct message sent");
        Ok(stored)
    }

    /// Both directions of the direct channel between `reader` and `other`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::send_direct_message`], minus text validation.
    #[instrument(skip(self, reader), fields(actor = %reader.id))]
    pub async fn direct_thread(
        &self,
        reader: &Profile,
        other: UserId,
    ) -> Result<Vec<ChatMessage>, ServiceError> {
        let channel = self.channel_with(reader, other).await?;
        Ok(self.store.direct_thread(channel).await?)
    }

    /// The administrator users open a direct chat with.
    ///
    /// # Errors
    ///
    /// Returns `NoAdminContact` when no admin profile exists.
    pub async fn admin_contact(&self) -> Result<Profile, ServiceError> {
        self.store
            .first_admin()
            .await?
            .ok_or(ServiceError::NoAdminContact)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fixflow_core::validation::NewRequestInput;
    use fixflow_core::{LifecycleError, Role, ValidationError};

    use super::*;
    use crate::db::MemoryStore;
    use crate::services::LifecycleService;
    use crate::services::testing::profile;

    #[tokio::test]
    async fn test_request_thread_follows_visibility() {
        let store = MemoryStore::new();
        let client = profile(&store, Role::Client, "Carla").await;
        let stranger = profile(&store, Role::Client, "Eva").await;
        let request = LifecycleService::new(&store)
            .submit_request(&client, NewRequestInput {
                description: "Leaky faucet".to_owned(),
                ..NewRequestInput::default()
            })
            .await
            .unwrap();
        let service = MessagingService::new(&store);

        let sent = service
            .send_request_message(&client, request.id, "  Is Monday ok?  ")
            .await
            .unwrap();
        assert_eq!(sent.message, "Is Monday ok?");
        assert_eq!(sent.request_id, Some(request.id));
        assert_eq!(sent.recipient_id, None);

        assert!(matches!(
            service.request_thread(&stranger, request.id).await,
            Err(ServiceError::Lifecycle(LifecycleError::Forbidden(_)))
        ));
        assert!(matches!(
            service
                .send_request_message(&stranger, request.id, "hello")
                .await,
            Err(ServiceError::Lifecycle(LifecycleError::Forbidden(_)))
        ));
        assert_eq!(
            service.request_thread(&client, request.id).await.unwrap(),
            vec![sent]
        );
    }

    #[tokio::test]
    async fn test_direct_thread_is_symmetric() {
        let store = MemoryStore::new();
        let admin = profile(&store, Role::Admin, "Ana").await;
        let client = profile(&store, Role::Client, "Carla").await;
        let service = MessagingService::new(&store);

        service
            .send_direct_message(&client, admin.id, "Hi")
            .await
            .unwrap();
        service
            .send_direct_message(&admin, client.id, "Hello Carla")
            .await
            .unwrap();

        let seen_by_client = service.direct_thread(&client, admin.id).await.unwrap();
        let seen_by_admin = service.direct_thread(&admin, client.id).await.unwrap();
        assert_eq!(seen_by_client, seen_by_admin);
        let texts: Vec<&str> = seen_by_client.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, ["Hi", "Hello Carla"]);
    }

    #[tokio::test]
    async fn test_direct_requires_admin_and_distinct_users() {
        let store = MemoryStore::new();
        let admin = profile(&store, Role::Admin, "Ana").await;
        let client = profile(&store, Role::Client, "Carla").await;
        let collaborator = profile(&store, Role::Collaborator, "Bruno").await;
        let service = MessagingService::new(&store);

        assert!(matches!(
            service
                .send_direct_message(&client, collaborator.id, "hi")
                .await,
            Err(ServiceError::Lifecycle(LifecycleError::Forbidden(_)))
        ));
        assert!(matches!(
            service.send_direct_message(&admin, admin.id, "hi").await,
            Err(ServiceError::Lifecycle(LifecycleError::Validation(
                ValidationError::SelfAddressed
            )))
        ));
        assert!(matches!(
            service.send_direct_message(&client, admin.id, "   ").await,
            Err(ServiceError::Validation(ValidationError::Required { .. }))
        ));
    }

    #[tokio::test]
    async fn test_admin_contact_missing() {
        let store = MemoryStore::new();
        let service = MessagingService::new(&store);
        assert!(matches!(
            service.admin_contact().await,
            Err(ServiceError::NoAdminContact)
        ));

        let admin = profile(&store, Role::Admin, "Ana").await;
        assert_eq!(service.admin_contact().await.unwrap().id, admin.id);
    }
}
