//! Message addressing.
//!
//! A message belongs either to a request thread or to a direct channel
//! between two users, one of whom is the administrator. The two are exclusive:
//! request-scoped messages never carry a recipient and direct messages never
//! carry a request id.

use serde::{Deserialize, Serialize};

use crate::lifecycle::{Actor, LifecycleError};
use crate::model::{ChatMessage, NewChatMessage, Profile};
use crate::types::{RequestId, UserId};
use crate::validation::{ValidationError, message_text};

/// Where a message is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Addressing {
    /// The thread attached to a service request.
    Request(RequestId),
    /// A direct channel with `recipient`.
    Direct { recipient: UserId },
}

impl Addressing {
    #[must_use]
    pub const fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::Request(id) => Some(*id),
            Self::Direct { .. } => None,
        }
    }

    #[must_use]
    pub const fn recipient_id(&self) -> Option<UserId> {
        match self {
            Self::Request(_) => None,
            Self::Direct { recipient } => Some(*recipient),
        }
    }
}

impl NewChatMessage {
    /// Compose a message from `sender`, normalizing the text.
    ///
    /// # Errors
    ///
    /// Rejects blank or oversized text.
    pub fn compose(
        addressing: Addressing,
        sender: &Profile,
        text: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            addressing,
            sender_id: sender.id,
            sender_name: sender.name.clone(),
            message: message_text(text)?,
        })
    }
}

/// An unordered pair of distinct users sharing a direct thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirectChannel {
    low: UserId,
    high: UserId,
}

impl DirectChannel {
    /// Build the channel between `a` and `b`, in either order.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::SelfAddressed`] when `a == b`.
    pub fn new(a: UserId, b: UserId) -> Result<Self, ValidationError> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Ok(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Ok(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => Err(ValidationError::SelfAddressed),
        }
    }

    /// Build the channel between two actors, one of whom must be an admin.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Validation`] when both are the same user.
    /// - [`LifecycleError::Forbidden`] when neither is an admin.
    pub fn between(a: &Actor, b: &Actor) -> Result<Self, LifecycleError> {
        let channel = Self::new(a.id, b.id)?;
        if !a.is_admin() && !b.is_admin() {
            return Err(LifecycleError::Forbidden(
                "direct messages must involve the administrator",
            ));
        }
        Ok(channel)
    }

    #[must_use]
    pub fn contains(&self, user: UserId) -> bool {
        self.low == user || self.high == user
    }

    /// The participant that is not `user`.
    #[must_use]
    pub fn other(&self, user: UserId) -> Option<UserId> {
        if user == self.low {
            Some(self.high)
        } else if user == self.high {
            Some(self.low)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn participants(&self) -> (UserId, UserId) {
        (self.low, self.high)
    }
}

/// Merge both directions of a direct thread into one conversation.
///
/// Ordered by `(created_at, id)`, so the result does not depend on which
/// direction is passed first.
#[must_use]
pub fn merge_direct(a_to_b: Vec<ChatMessage>, b_to_a: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let mut thread = a_to_b;
    thread.extend(b_to_a);
    sort_thread(&mut thread);
    thread.dedup_by_key(|message| message.id);
    thread
}

/// Sort a thread oldest first, breaking timestamp ties by insertion order.
pub fn sort_thread(thread: &mut [ChatMessage]) {
    thread.sort_by_key(|message| (message.created_at, message.id));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::fixtures::at;
    use crate::types::{ChatMessageId, Role};

    fn direct(id: i64, from: UserId, to: UserId, hour: u32) -> ChatMessage {
        ChatMessage {
            id: ChatMessageId::new(id),
            request_id: None,
            sender_id: from,
            sender_name: String::new(),
            sender_role: None,
            recipient_id: Some(to),
            message: format!("m{id}"),
            created_at: at(5, hour),
        }
    }

    #[test]
    fn test_channel_rejects_self() {
        let me = UserId::random();
        assert_eq!(
            DirectChannel::new(me, me),
            Err(ValidationError::SelfAddressed)
        );
    }

    #[test]
    fn test_channel_is_unordered() {
        let a = UserId::random();
        let b = UserId::random();
        let ab = DirectChannel::new(a, b).unwrap();
        assert_eq!(ab, DirectChannel::new(b, a).unwrap());
        assert!(ab.contains(a) && ab.contains(b));
        assert!(!ab.contains(UserId::random()));
        assert_eq!(ab.other(a), Some(b));
    }

    #[test]
    fn test_channel_requires_admin() {
        let client = Actor::new(UserId::random(), Role::Client);
        let collaborator = Actor::new(UserId::random(), Role::Collaborator);
        let admin = Actor::new(UserId::random(), Role::Admin);

        assert!(matches!(
            DirectChannel::between(&client, &collaborator),
            Err(LifecycleError::Forbidden(_))
        ));
        assert!(DirectChannel::between(&client, &admin).is_ok());
        assert!(DirectChannel::between(&admin, &collaborator).is_ok());
    }

    #[test]
    fn test_addressing_is_exclusive() {
        let request = Addressing::Request(RequestId::new(3));
        assert_eq!(request.request_id(), Some(RequestId::new(3)));
        assert_eq!(request.recipient_id(), None);

        let recipient = UserId::random();
        let dm = Addressing::Direct { recipient };
        assert_eq!(dm.request_id(), None);
        assert_eq!(dm.recipient_id(), Some(recipient));
    }

    #[test]
    fn test_merge_is_symmetric_with_id_tiebreak() {
        let a = UserId::random();
        let b = UserId::random();
        let a_to_b = vec![direct(1, a, b, 9), direct(4, a, b, 11)];
        let b_to_a = vec![direct(2, b, a, 10), direct(3, b, a, 11)];

        let forward = merge_direct(a_to_b.clone(), b_to_a.clone());
        let backward = merge_direct(b_to_a, a_to_b);

        assert_eq!(forward, backward);
        let ids: Vec<i64> = forward.iter().map(|m| m.id.as_i64()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }
}
