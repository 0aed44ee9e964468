//! Read-receipt emission.
//!
//! Tells the server which messages the local user has seen by sending one
//! outbound `UPDATE_READERS` per message. Receipts are best-effort: while
//! disconnected nothing is queued, and the server's reader sets resync the
//! truth on the next history load.

use std::sync::Arc;

use palaver_proto::domain::{ChatId, MessageId, UserId};
use palaver_proto::event::ClientEvent;

use crate::connection::{ConnectionManager, SendError};
use crate::transport::SocketTransport;
use crate::unread::UnreadTracker;

/// Emits read acknowledgements for the local user.
pub struct ReadReceiptEmitter<T: SocketTransport> {
    connection: Arc<ConnectionManager<T>>,
    local: UserId,
}

impl<T: SocketTransport> ReadReceiptEmitter<T> {
    /// Create an emitter sending through the given connection.
    #[must_use]
    pub fn new(connection: Arc<ConnectionManager<T>>, local: UserId) -> Self {
        Self { connection, local }
    }

    /// Acknowledge one visible message.
    ///
    /// Returns `Ok(false)` when not connected (the receipt is lost, not
    /// stored).
    ///
    /// # Errors
    ///
    /// Propagates encoding and transport failures.
    pub async fn notify_visible(
        &self,
        chat_id: &ChatId,
        message_id: &MessageId,
    ) -> Result<bool, SendError> {
        let event = ClientEvent::UpdateReaders {
            chat_id: chat_id.clone(),
            message_id: message_id.clone(),
            user_id: self.local.clone(),
        };
        match self.connection.send(&event).await {
            Ok(()) => Ok(true),
            Err(SendError::NotConnected) => {
                tracing::debug!(%chat_id, %message_id, "receipt skipped: not connected");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Acknowledge every currently-unread message in a conversation, then
    /// clear the unread set.
    ///
    /// One event per unread id, never for anything else. The local clear
    /// happens even when disconnected; the server catches up from history
    /// reader sets later. Returns how many receipts actually went out.
    ///
    /// # Errors
    ///
    /// Propagates encoding and transport failures other than
    /// `NotConnected`.
    pub async fn notify_all_visible(
        &self,
        unread: &mut UnreadTracker,
        chat_id: &ChatId,
    ) -> Result<usize, SendError> {
        let ids = unread.unread_ids(chat_id);
        let mut emitted = 0;
        for message_id in &ids {
            match self.notify_visible(chat_id, message_id).await {
                Ok(true) => emitted += 1,
                Ok(false) => break,
                Err(e) => return Err(e),
            }
        }
        unread.mark_all_read(chat_id);
        Ok(emitted)
    }
}
