//! Inbound event dispatch.
//!
//! One owning handler per wire tag: messages and reader updates feed the
//! store and the unread tracker, presence events feed the system-notice
//! slot. The dispatcher is the only place store and unread state mutate in
//! response to the server, so the two can never drift apart.

use palaver_proto::domain::{ChatId, Message, MessageId, MessageKind};
use palaver_proto::event::ServerEvent;

use crate::presence;
use crate::store::{MergeDirection, MessageStore};
use crate::unread::UnreadTracker;

/// What applying one inbound event did to local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A new message entered a timeline.
    Appended {
        /// The conversation that grew.
        chat_id: ChatId,
        /// The appended message.
        message_id: MessageId,
        /// Whether the unread set changed.
        unread_changed: bool,
    },
    /// The message was already held; nothing changed.
    DuplicateMessage {
        /// The conversation addressed.
        chat_id: ChatId,
        /// The redelivered id.
        message_id: MessageId,
    },
    /// A reader set was replaced.
    ReadersUpdated {
        /// The conversation addressed.
        chat_id: ChatId,
        /// The message whose readers changed.
        message_id: MessageId,
        /// Whether the unread set changed.
        unread_changed: bool,
    },
    /// A reader update addressed a message we do not hold; dropped.
    UnknownMessage {
        /// The conversation addressed.
        chat_id: ChatId,
        /// The unknown id.
        message_id: MessageId,
    },
    /// A presence notice was installed.
    Notice {
        /// The conversation the notice belongs to.
        chat_id: ChatId,
    },
}

/// Routes decoded server events into the store and unread tracker.
pub struct EventDispatcher {
    store: MessageStore,
    unread: UnreadTracker,
}

impl EventDispatcher {
    /// Create a dispatcher over fresh state for the given local user.
    #[must_use]
    pub fn new(local: palaver_proto::domain::UserId) -> Self {
        Self {
            store: MessageStore::new(),
            unread: UnreadTracker::new(local),
        }
    }

    /// The message store.
    #[must_use]
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Mutable access to the store for explicit user intents.
    pub fn store_mut(&mut self) -> &mut MessageStore {
        &mut self.store
    }

    /// The unread tracker.
    #[must_use]
    pub fn unread(&self) -> &UnreadTracker {
        &self.unread
    }

    /// Mutable access to the unread tracker for explicit user intents.
    pub fn unread_mut(&mut self) -> &mut UnreadTracker {
        &mut self.unread
    }

    /// Apply one decoded server event to local state.
    pub fn dispatch(&mut self, event: ServerEvent) -> DispatchOutcome {
        match event {
            ServerEvent::Message {
                chat_id,
                message_id,
                user,
                message,
                readers,
                created_at,
                updated_at,
            } => {
                let incoming = Message {
                    id: message_id.clone(),
                    chat_id: chat_id.clone(),
                    author: user,
                    text: message,
                    created_at,
                    updated_at,
                    readers,
                    kind: MessageKind::User,
                };
                if self.store.append(incoming) {
                    // Safe: append just inserted it.
                    let unread_changed = self
                        .store
                        .find(&chat_id, &message_id)
                        .is_some_and(|m| self.unread.observe_append(m));
                    DispatchOutcome::Appended {
                        chat_id,
                        message_id,
                        unread_changed,
                    }
                } else {
                    tracing::debug!(%chat_id, %message_id, "duplicate message dropped");
                    DispatchOutcome::DuplicateMessage {
                        chat_id,
                        message_id,
                    }
                }
            }
            ServerEvent::UpdateReaders {
                chat_id,
                message_id,
                readers,
            } => {
                if self.store.update_readers(&chat_id, &message_id, readers.clone()) {
                    let unread_changed =
                        self.unread.observe_readers(&chat_id, &message_id, &readers);
                    DispatchOutcome::ReadersUpdated {
                        chat_id,
                        message_id,
                        unread_changed,
                    }
                } else {
                    tracing::debug!(%chat_id, %message_id, "reader update for unknown message dropped");
                    DispatchOutcome::UnknownMessage {
                        chat_id,
                        message_id,
                    }
                }
            }
            ServerEvent::UserEnterChat { chat_id, user } => {
                self.store
                    .set_system_notice(&chat_id, presence::enter_notice(&user.username));
                DispatchOutcome::Notice { chat_id }
            }
            ServerEvent::UserExitChat { chat_id, user } => {
                self.store
                    .set_system_notice(&chat_id, presence::exit_notice(&user.username));
                DispatchOutcome::Notice { chat_id }
            }
        }
    }

    /// Merge a history page and fold its new messages into unread state.
    ///
    /// Messages the page brought in count as unread under the same rule as
    /// live appends (local user absent from the reader set).
    pub fn merge_history(
        &mut self,
        chat_id: &ChatId,
        page: Vec<Message>,
        direction: MergeDirection,
    ) -> Vec<MessageId> {
        let inserted = self.store.merge_history(chat_id, page, direction);
        for message_id in &inserted {
            if let Some(message) = self.store.find(chat_id, message_id) {
                self.unread.observe_append(message);
            }
        }
        inserted
    }
}
