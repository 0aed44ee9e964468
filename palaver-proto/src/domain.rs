//! Domain types shared between the wire protocol and the client core.
//!
//! Identifiers are opaque UUIDs assigned by the server; the client never
//! derives meaning from their contents. Timestamps are unix seconds and are
//! carried raw so that display formatting never loses precision.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a user account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a `UserId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The nil identifier, used as the author of synthetic system notices.
    #[must_use]
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a conversation (called "chat" throughout the protocol).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChatId(Uuid);

impl ChatId {
    /// Creates a `ChatId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a message.
///
/// Live and historical deliveries of the same message carry the same id;
/// the store deduplicates on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Creates a new time-ordered message identifier (UUID v7).
    ///
    /// Only used for client-synthesized system notices; server-authored
    /// messages arrive with their id already assigned.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `MessageId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Second-precision unix timestamp.
///
/// The raw value is preserved end to end; [`Timestamp::format_local`] is the
/// only place a display representation is produced.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp for the current instant.
    #[must_use]
    pub fn now() -> Self {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self(i64::try_from(secs).unwrap_or(i64::MAX))
    }

    /// Creates a timestamp from seconds since the UNIX epoch.
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs)
    }

    /// Returns the timestamp as seconds since the UNIX epoch.
    #[must_use]
    pub const fn as_secs(&self) -> i64 {
        self.0
    }

    /// Renders the timestamp as `DD.MM.YYYY HH:mm:ss` in local time.
    ///
    /// Presentation-boundary helper; timestamps out of `chrono`'s
    /// representable range fall back to the raw second count.
    #[must_use]
    pub fn format_local(&self) -> String {
        chrono::DateTime::from_timestamp(self.0, 0).map_or_else(
            || self.0.to_string(),
            |utc| {
                utc.with_timezone(&chrono::Local)
                    .format("%d.%m.%Y %H:%M:%S")
                    .to_string()
            },
        )
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// A user as carried on the wire and inside reader sets.
///
/// Identity is `user_id`; `email` is only populated for the local account
/// fetched from the auth collaborator and never appears in wire payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Server-assigned account identifier.
    pub user_id: UserId,
    /// Display name.
    pub username: String,
    /// Account email, known only for the local user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    /// Creates a user with no email (the wire payload shape).
    #[must_use]
    pub const fn new(user_id: UserId, username: String) -> Self {
        Self {
            user_id,
            username,
            email: None,
        }
    }

    /// Synthetic author attached to client-generated system notices.
    #[must_use]
    pub fn system() -> Self {
        Self::new(UserId::nil(), "system".to_string())
    }
}

/// Distinguishes user-authored messages from transient system notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// A message authored by a user, delivered live or via history.
    User,
    /// A transient presence notice; replaced when superseded, never persisted.
    System,
}

/// A message in a conversation timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Identity key; no timeline holds two messages with the same id.
    pub id: MessageId,
    /// The conversation this message belongs to.
    pub chat_id: ChatId,
    /// Who wrote the message.
    pub author: User,
    /// Message body.
    pub text: String,
    /// Creation time (unix seconds, raw).
    pub created_at: Timestamp,
    /// Last update time (unix seconds, raw).
    pub updated_at: Timestamp,
    /// Users who have read this message, in server order; no duplicates.
    pub readers: Vec<User>,
    /// User message or transient system notice.
    pub kind: MessageKind,
}

impl Message {
    /// Returns `true` if the given user appears in the reader set.
    #[must_use]
    pub fn has_reader(&self, user_id: &UserId) -> bool {
        self.readers.iter().any(|r| r.user_id == *user_id)
    }

    /// Replaces the reader set. The only mutation a message ever undergoes.
    pub fn set_readers(&mut self, readers: Vec<User>) {
        self.readers = readers;
    }
}
