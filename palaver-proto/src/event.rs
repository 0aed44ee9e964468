//! Event envelopes exchanged over the persistent socket.
//!
//! Every frame is a JSON object with a `type` discriminant. Inbound and
//! outbound envelopes are separate enums because several tags carry
//! different payloads in each direction (`UPDATE_READERS` delivers a full
//! reader set inbound but only the acknowledging `user_id` outbound).

use serde::{Deserialize, Serialize};

use crate::domain::{ChatId, Message, MessageId, MessageKind, Timestamp, User};

/// Events delivered by the server over the socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerEvent {
    /// A new user-authored message in a conversation.
    Message {
        /// The conversation the message belongs to.
        chat_id: ChatId,
        /// Server-assigned message identity.
        message_id: MessageId,
        /// The author, in wire shape (`user_id` + `username`).
        user: User,
        /// Message body.
        message: String,
        /// Users who had already read the message at delivery time.
        #[serde(default)]
        readers: Vec<User>,
        /// Creation time, unix seconds.
        created_at: Timestamp,
        /// Last update time, unix seconds.
        updated_at: Timestamp,
    },
    /// The full replacement reader set for one message.
    UpdateReaders {
        /// The conversation the message belongs to.
        chat_id: ChatId,
        /// The message whose readers changed.
        message_id: MessageId,
        /// The new reader set, replacing the previous one wholesale.
        readers: Vec<User>,
    },
    /// A user entered a conversation.
    UserEnterChat {
        /// The conversation that was entered.
        chat_id: ChatId,
        /// The entering user (username only on this tag).
        user: PresenceUser,
    },
    /// A user left a conversation.
    UserExitChat {
        /// The conversation that was left.
        chat_id: ChatId,
        /// The departing user (username only on this tag).
        user: PresenceUser,
    },
}

/// The reduced user payload carried on presence tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUser {
    /// Display name of the user entering or leaving.
    pub username: String,
}

/// Events the client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientEvent {
    /// Handshake keep-alive sent once on every successful open.
    Ping,
    /// Read acknowledgement: the local user has seen one message.
    UpdateReaders {
        /// The conversation the message belongs to.
        chat_id: ChatId,
        /// The message being acknowledged.
        message_id: MessageId,
        /// The acknowledging (local) user.
        user_id: crate::domain::UserId,
    },
    /// The local user opened a conversation.
    UserEnterChat {
        /// The conversation being entered.
        chat_id: ChatId,
    },
    /// The local user left a conversation.
    UserExitChat {
        /// The conversation being left.
        chat_id: ChatId,
    },
}

/// One item of a history page fetched from the REST collaborator.
///
/// Same shape as the live `MESSAGE` payload except the body field is named
/// `text` and `chat_id` is implied by the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    /// Server-assigned message identity.
    pub message_id: MessageId,
    /// The author, in wire shape.
    pub user: User,
    /// Message body.
    pub text: String,
    /// Users who have read the message.
    #[serde(default)]
    pub readers: Vec<User>,
    /// Creation time, unix seconds.
    pub created_at: Timestamp,
    /// Last update time, unix seconds.
    pub updated_at: Timestamp,
}

impl HistoryMessage {
    /// Converts a history page item into a timeline [`Message`].
    #[must_use]
    pub fn into_message(self, chat_id: ChatId) -> Message {
        Message {
            id: self.message_id,
            chat_id,
            author: self.user,
            text: self.text,
            created_at: self.created_at,
            updated_at: self.updated_at,
            readers: self.readers,
            kind: MessageKind::User,
        }
    }
}
