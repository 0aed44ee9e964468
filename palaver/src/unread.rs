//! Unread tracking, maintained incrementally from store mutations.
//!
//! A message id is unread when the local user was absent from its reader
//! set the last time it changed and it has not been explicitly cleared.
//! The tracker never rescans timelines; it observes the same events the
//! store applies.

use std::collections::{HashMap, HashSet};

use palaver_proto::domain::{ChatId, Message, MessageId, MessageKind, User, UserId};

/// Per-conversation unread sets for one local user.
pub struct UnreadTracker {
    local: UserId,
    unread: HashMap<ChatId, HashSet<MessageId>>,
}

impl UnreadTracker {
    /// Create a tracker for the given local user.
    #[must_use]
    pub fn new(local: UserId) -> Self {
        Self {
            local,
            unread: HashMap::new(),
        }
    }

    /// Observe a message entering the store (live append or history merge).
    ///
    /// System notices are never unread. Returns `true` when the id was
    /// added to the unread set.
    pub fn observe_append(&mut self, message: &Message) -> bool {
        if message.kind == MessageKind::System {
            return false;
        }
        if message.has_reader(&self.local) {
            return false;
        }
        self.unread
            .entry(message.chat_id.clone())
            .or_default()
            .insert(message.id.clone())
    }

    /// Observe a reader-set replacement.
    ///
    /// Removes the id when the local user now appears among the readers;
    /// a replacement that still lacks the local user changes nothing.
    /// Returns `true` when the unread set changed.
    pub fn observe_readers(
        &mut self,
        chat_id: &ChatId,
        message_id: &MessageId,
        readers: &[User],
    ) -> bool {
        if !readers.iter().any(|r| r.user_id == self.local) {
            return false;
        }
        self.unread
            .get_mut(chat_id)
            .is_some_and(|set| set.remove(message_id))
    }

    /// Clear one id explicitly (the local user saw the message).
    pub fn mark_read(&mut self, chat_id: &ChatId, message_id: &MessageId) -> bool {
        self.unread
            .get_mut(chat_id)
            .is_some_and(|set| set.remove(message_id))
    }

    /// Drain a conversation's whole unread set, returning the cleared ids.
    pub fn mark_all_read(&mut self, chat_id: &ChatId) -> Vec<MessageId> {
        let Some(set) = self.unread.get_mut(chat_id) else {
            return Vec::new();
        };
        let mut ids: Vec<MessageId> = set.drain().collect();
        ids.sort_unstable();
        ids
    }

    /// Unread message ids for a conversation, in stable (sorted) order.
    #[must_use]
    pub fn unread_ids(&self, chat_id: &ChatId) -> Vec<MessageId> {
        let mut ids: Vec<MessageId> = self
            .unread
            .get(chat_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    /// Number of unread messages in a conversation.
    #[must_use]
    pub fn count(&self, chat_id: &ChatId) -> usize {
        self.unread.get(chat_id).map_or(0, HashSet::len)
    }

    /// Whether one specific message is unread.
    #[must_use]
    pub fn is_unread(&self, chat_id: &ChatId, message_id: &MessageId) -> bool {
        self.unread
            .get(chat_id)
            .is_some_and(|set| set.contains(message_id))
    }
}
