//! In-memory message store: one ordered timeline per conversation.
//!
//! The store is the single authority on message ordering and identity.
//! Live appends and history merges go through the same duplicate check so
//! a message delivered over both paths lands exactly once. Reads never
//! mutate: asking for an unknown conversation's timeline returns an empty
//! slice instead of creating an entry.

use std::collections::{HashMap, HashSet};

use palaver_proto::domain::{ChatId, Message, MessageId, MessageKind, Timestamp, User};

/// Where a history page attaches to an existing timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDirection {
    /// The page precedes everything already held (pagination backwards).
    Older,
    /// The page follows everything already held (gap fill after reconnect).
    Newer,
}

#[derive(Default)]
struct Timeline {
    messages: Vec<Message>,
    /// Identity index; mirrors `messages` exactly.
    ids: HashSet<MessageId>,
}

impl Timeline {
    fn insert_tail(&mut self, message: Message) -> bool {
        if !self.ids.insert(message.id.clone()) {
            return false;
        }
        self.messages.push(message);
        true
    }
}

/// Per-session message state for every conversation.
#[derive(Default)]
pub struct MessageStore {
    chats: HashMap<ChatId, Timeline>,
}

impl MessageStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure a conversation exists, with an empty timeline if new.
    pub fn ensure_chat(&mut self, chat_id: &ChatId) {
        if !self.chats.contains_key(chat_id) {
            self.chats.insert(chat_id.clone(), Timeline::default());
        }
    }

    /// Append a live message to its conversation's timeline.
    ///
    /// Returns `false` (and changes nothing) when a message with the same
    /// id is already held, making redelivery and history races harmless.
    pub fn append(&mut self, message: Message) -> bool {
        self.chats
            .entry(message.chat_id.clone())
            .or_default()
            .insert_tail(message)
    }

    /// Merge one history page, given oldest-first, into a timeline.
    ///
    /// Messages whose id is already held are skipped; the rest are spliced
    /// at the head (`Older`) or appended at the tail (`Newer`) preserving
    /// their order. Returns the ids that were actually inserted. Correct
    /// even when live messages arrived before the page did: the live tail
    /// keeps its position and duplicates inside the page are dropped.
    pub fn merge_history(
        &mut self,
        chat_id: &ChatId,
        page: Vec<Message>,
        direction: MergeDirection,
    ) -> Vec<MessageId> {
        let timeline = self.chats.entry(chat_id.clone()).or_default();
        let mut fresh: Vec<Message> = Vec::with_capacity(page.len());
        for message in page {
            if timeline.ids.insert(message.id.clone()) {
                fresh.push(message);
            }
        }
        let inserted: Vec<MessageId> = fresh.iter().map(|m| m.id.clone()).collect();
        match direction {
            MergeDirection::Older => {
                timeline.messages.splice(0..0, fresh);
            }
            MergeDirection::Newer => {
                timeline.messages.extend(fresh);
            }
        }
        inserted
    }

    /// Replace one message's reader set wholesale.
    ///
    /// Returns `false` when the conversation or the message is unknown; an
    /// update racing ahead of its message is dropped, not buffered.
    pub fn update_readers(
        &mut self,
        chat_id: &ChatId,
        message_id: &MessageId,
        readers: Vec<User>,
    ) -> bool {
        let Some(timeline) = self.chats.get_mut(chat_id) else {
            return false;
        };
        let Some(message) = timeline.messages.iter_mut().find(|m| m.id == *message_id) else {
            return false;
        };
        message.set_readers(readers);
        true
    }

    /// The ordered timeline of a conversation; empty for unknown chats.
    #[must_use]
    pub fn timeline(&self, chat_id: &ChatId) -> &[Message] {
        self.chats
            .get(chat_id)
            .map_or(&[], |t| t.messages.as_slice())
    }

    /// Look up one message by id.
    #[must_use]
    pub fn find(&self, chat_id: &ChatId, message_id: &MessageId) -> Option<&Message> {
        self.chats
            .get(chat_id)?
            .messages
            .iter()
            .find(|m| m.id == *message_id)
    }

    /// Whether the given message id is already held.
    #[must_use]
    pub fn contains(&self, chat_id: &ChatId, message_id: &MessageId) -> bool {
        self.chats
            .get(chat_id)
            .is_some_and(|t| t.ids.contains(message_id))
    }

    /// Install a transient system notice, replacing any previous one.
    ///
    /// At most one system-kind message exists per conversation; a new
    /// notice supersedes and removes the old one.
    pub fn set_system_notice(&mut self, chat_id: &ChatId, text: String) -> MessageId {
        let timeline = self.chats.entry(chat_id.clone()).or_default();
        if let Some(pos) = timeline
            .messages
            .iter()
            .position(|m| m.kind == MessageKind::System)
        {
            let old = timeline.messages.remove(pos);
            timeline.ids.remove(&old.id);
        }
        let now = Timestamp::now();
        let notice = Message {
            id: MessageId::new(),
            chat_id: chat_id.clone(),
            author: User::system(),
            text,
            created_at: now,
            updated_at: now,
            readers: Vec::new(),
            kind: MessageKind::System,
        };
        let id = notice.id.clone();
        timeline.insert_tail(notice);
        id
    }

    /// The current system notice for a conversation, if any.
    #[must_use]
    pub fn system_notice(&self, chat_id: &ChatId) -> Option<&Message> {
        self.chats
            .get(chat_id)?
            .messages
            .iter()
            .find(|m| m.kind == MessageKind::System)
    }
}
