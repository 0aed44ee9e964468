//! Presence signalling and system notices.
//!
//! Inbound enter/exit events become a transient system message in the
//! store (one per conversation, newest wins). Outbound enter/exit events
//! are best-effort: while disconnected they are skipped, not queued.

use std::sync::Arc;

use palaver_proto::domain::ChatId;
use palaver_proto::event::ClientEvent;

use crate::connection::{ConnectionManager, SendError};
use crate::transport::SocketTransport;

/// Notice text for a user entering a conversation.
#[must_use]
pub fn enter_notice(username: &str) -> String {
    format!("{username} joined the conversation")
}

/// Notice text for a user leaving a conversation.
#[must_use]
pub fn exit_notice(username: &str) -> String {
    format!("{username} left the conversation")
}

/// Sends the local user's enter/exit signals.
pub struct PresenceNotifier<T: SocketTransport> {
    connection: Arc<ConnectionManager<T>>,
}

impl<T: SocketTransport> PresenceNotifier<T> {
    /// Create a notifier sending through the given connection.
    #[must_use]
    pub fn new(connection: Arc<ConnectionManager<T>>) -> Self {
        Self { connection }
    }

    /// Announce that the local user opened a conversation.
    ///
    /// Returns `Ok(false)` when not connected (the signal is dropped).
    ///
    /// # Errors
    ///
    /// Propagates encoding and transport failures.
    pub async fn enter_chat(&self, chat_id: &ChatId) -> Result<bool, SendError> {
        self.signal(ClientEvent::UserEnterChat {
            chat_id: chat_id.clone(),
        })
        .await
    }

    /// Announce that the local user left a conversation.
    ///
    /// Returns `Ok(false)` when not connected (the signal is dropped).
    ///
    /// # Errors
    ///
    /// Propagates encoding and transport failures.
    pub async fn exit_chat(&self, chat_id: &ChatId) -> Result<bool, SendError> {
        self.signal(ClientEvent::UserExitChat {
            chat_id: chat_id.clone(),
        })
        .await
    }

    async fn signal(&self, event: ClientEvent) -> Result<bool, SendError> {
        match self.connection.send(&event).await {
            Ok(()) => Ok(true),
            Err(SendError::NotConnected) => {
                tracing::debug!("presence signal skipped: not connected");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
