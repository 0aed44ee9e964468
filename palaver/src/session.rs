//! Session wiring: one logical thread of control over all chat state.
//!
//! A [`ChatSession`] owns the dispatcher (store + unread), drains the
//! connection's inbound event channel, and carries the user intents:
//! opening a conversation (with its lazy first-view history fetch),
//! marking messages read, and leaving. UI layers consume the
//! [`SessionEvent`] channel instead of polling state.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc;

use palaver_proto::domain::{ChatId, Message, MessageId, User};
use palaver_proto::event::ServerEvent;

use crate::api::{ApiError, RestApi};
use crate::config::ClientConfig;
use crate::connection::{ConnectError, ConnectionManager, SendError};
use crate::dispatch::{DispatchOutcome, EventDispatcher};
use crate::presence::PresenceNotifier;
use crate::receipts::ReadReceiptEmitter;
use crate::store::MergeDirection;
use crate::transport::SocketTransport;

/// Errors surfaced by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The REST collaborator failed.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// An outbound event could not be sent.
    #[error("send error: {0}")]
    Send(#[from] SendError),

    /// Connecting failed.
    #[error("connect error: {0}")]
    Connect(#[from] ConnectError),
}

/// State-change notifications for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new message landed in a timeline.
    MessageArrived {
        /// The conversation that grew.
        chat_id: ChatId,
        /// The new message.
        message_id: MessageId,
    },
    /// A message's reader set changed.
    ReadersChanged {
        /// The conversation addressed.
        chat_id: ChatId,
        /// The message whose readers changed.
        message_id: MessageId,
    },
    /// A conversation's unread count changed.
    UnreadChanged {
        /// The conversation addressed.
        chat_id: ChatId,
        /// The new unread count.
        count: usize,
    },
    /// A conversation's presence notice changed.
    NoticeChanged {
        /// The conversation addressed.
        chat_id: ChatId,
    },
}

/// One user's live chat session.
pub struct ChatSession<T: SocketTransport, A: RestApi> {
    connection: Arc<ConnectionManager<T>>,
    api: A,
    local: User,
    dispatcher: EventDispatcher,
    receipts: ReadReceiptEmitter<T>,
    presence: PresenceNotifier<T>,
    events: mpsc::Receiver<ServerEvent>,
    session_tx: mpsc::Sender<SessionEvent>,
    /// Conversations whose first history page was already fetched.
    history_loaded: HashSet<ChatId>,
    history_page_size: u32,
}

impl<T: SocketTransport, A: RestApi> ChatSession<T, A> {
    /// Wire a session over an existing connection manager.
    ///
    /// `events` must be the receiver handed out by
    /// [`ConnectionManager::new`] for the same manager. Returns the session
    /// and the [`SessionEvent`] receiver for the UI.
    #[must_use]
    pub fn new(
        connection: Arc<ConnectionManager<T>>,
        events: mpsc::Receiver<ServerEvent>,
        api: A,
        local: User,
        config: &ClientConfig,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (session_tx, session_rx) = mpsc::channel(config.session_event_buffer);
        let session = Self {
            receipts: ReadReceiptEmitter::new(Arc::clone(&connection), local.user_id.clone()),
            presence: PresenceNotifier::new(Arc::clone(&connection)),
            dispatcher: EventDispatcher::new(local.user_id.clone()),
            connection,
            api,
            local,
            events,
            session_tx,
            history_loaded: HashSet::new(),
            history_page_size: config.history_page_size,
        };
        (session, session_rx)
    }

    /// The local account this session belongs to.
    #[must_use]
    pub fn local_user(&self) -> &User {
        &self.local
    }

    /// The underlying connection manager.
    #[must_use]
    pub fn connection(&self) -> &Arc<ConnectionManager<T>> {
        &self.connection
    }

    /// A conversation's ordered timeline.
    #[must_use]
    pub fn timeline(&self, chat_id: &ChatId) -> &[Message] {
        self.dispatcher.store().timeline(chat_id)
    }

    /// A conversation's unread count.
    #[must_use]
    pub fn unread_count(&self, chat_id: &ChatId) -> usize {
        self.dispatcher.unread().count(chat_id)
    }

    /// A conversation's current presence notice, if any.
    #[must_use]
    pub fn system_notice(&self, chat_id: &ChatId) -> Option<&Message> {
        self.dispatcher.store().system_notice(chat_id)
    }

    /// Bring the connection up.
    ///
    /// # Errors
    ///
    /// See [`ConnectError`].
    pub async fn connect(&self) -> Result<(), SessionError> {
        self.connection.connect().await?;
        Ok(())
    }

    /// Tear the connection down.
    pub async fn disconnect(&self) {
        self.connection.disconnect().await;
    }

    /// Open a conversation: fetch its first history page (once per
    /// session), merge it, and announce presence.
    ///
    /// # Errors
    ///
    /// History fetch failures abort the open; presence failures other than
    /// being disconnected propagate.
    pub async fn open_chat(&mut self, chat_id: &ChatId) -> Result<(), SessionError> {
        self.dispatcher.store_mut().ensure_chat(chat_id);
        if !self.history_loaded.contains(chat_id) {
            let page = self
                .api
                .get_history(chat_id, self.history_page_size, 0)
                .await?;
            let messages: Vec<Message> = page
                .into_iter()
                .map(|item| item.into_message(chat_id.clone()))
                .collect();
            let inserted =
                self.dispatcher
                    .merge_history(chat_id, messages, MergeDirection::Older);
            self.history_loaded.insert(chat_id.clone());
            tracing::debug!(%chat_id, merged = inserted.len(), "history page merged");
            let count = self.dispatcher.unread().count(chat_id);
            self.emit(SessionEvent::UnreadChanged {
                chat_id: chat_id.clone(),
                count,
            })
            .await;
        }
        self.presence.enter_chat(chat_id).await?;
        Ok(())
    }

    /// Leave a conversation, announcing the exit when connected.
    ///
    /// # Errors
    ///
    /// Propagates send failures other than being disconnected.
    pub async fn close_chat(&mut self, chat_id: &ChatId) -> Result<(), SessionError> {
        self.presence.exit_chat(chat_id).await?;
        Ok(())
    }

    /// Acknowledge everything unread in a conversation and clear it
    /// locally. Returns the number of receipts that went out.
    ///
    /// # Errors
    ///
    /// Propagates send failures other than being disconnected.
    pub async fn mark_chat_read(&mut self, chat_id: &ChatId) -> Result<usize, SessionError> {
        let emitted = self
            .receipts
            .notify_all_visible(self.dispatcher.unread_mut(), chat_id)
            .await?;
        let count = self.dispatcher.unread().count(chat_id);
        self.emit(SessionEvent::UnreadChanged {
            chat_id: chat_id.clone(),
            count,
        })
        .await;
        Ok(emitted)
    }

    /// Acknowledge one message the user just saw.
    ///
    /// No-op when the message is not currently unread.
    ///
    /// # Errors
    ///
    /// Propagates send failures other than being disconnected.
    pub async fn notify_message_visible(
        &mut self,
        chat_id: &ChatId,
        message_id: &MessageId,
    ) -> Result<(), SessionError> {
        if !self.dispatcher.unread().is_unread(chat_id, message_id) {
            return Ok(());
        }
        self.receipts.notify_visible(chat_id, message_id).await?;
        self.dispatcher.unread_mut().mark_read(chat_id, message_id);
        let count = self.dispatcher.unread().count(chat_id);
        self.emit(SessionEvent::UnreadChanged {
            chat_id: chat_id.clone(),
            count,
        })
        .await;
        Ok(())
    }

    /// Apply the next inbound event. Returns `false` once the event
    /// channel closed (the connection manager is gone).
    pub async fn pump(&mut self) -> bool {
        let Some(event) = self.events.recv().await else {
            return false;
        };
        self.apply(event).await;
        true
    }

    /// Drain inbound events until the channel closes.
    pub async fn run(&mut self) {
        while self.pump().await {}
    }

    async fn apply(&mut self, event: ServerEvent) {
        match self.dispatcher.dispatch(event) {
            DispatchOutcome::Appended {
                chat_id,
                message_id,
                unread_changed,
            } => {
                self.emit(SessionEvent::MessageArrived {
                    chat_id: chat_id.clone(),
                    message_id,
                })
                .await;
                if unread_changed {
                    let count = self.dispatcher.unread().count(&chat_id);
                    self.emit(SessionEvent::UnreadChanged { chat_id, count }).await;
                }
            }
            DispatchOutcome::ReadersUpdated {
                chat_id,
                message_id,
                unread_changed,
            } => {
                self.emit(SessionEvent::ReadersChanged {
                    chat_id: chat_id.clone(),
                    message_id,
                })
                .await;
                if unread_changed {
                    let count = self.dispatcher.unread().count(&chat_id);
                    self.emit(SessionEvent::UnreadChanged { chat_id, count }).await;
                }
            }
            DispatchOutcome::Notice { chat_id } => {
                self.emit(SessionEvent::NoticeChanged { chat_id }).await;
            }
            DispatchOutcome::DuplicateMessage { chat_id, message_id } => {
                tracing::debug!(%chat_id, %message_id, "duplicate delivery ignored");
            }
            DispatchOutcome::UnknownMessage { chat_id, message_id } => {
                tracing::debug!(%chat_id, %message_id, "event for unknown message ignored");
            }
        }
    }

    async fn emit(&self, event: SessionEvent) {
        if self.session_tx.send(event).await.is_err() {
            tracing::debug!("session event subscriber dropped");
        }
    }
}
