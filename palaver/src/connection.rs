//! Connection manager: sole owner of the persistent socket.
//!
//! Drives the `Disconnected → Connecting → Authenticating → Connected`
//! lifecycle and the `Reconnecting` recovery path. Every observable rule
//! lives here:
//!
//! - at most one socket and one pending retry timer exist at any time;
//! - transport errors and clean closes are one and the same failure signal,
//!   and only the first signal for the current socket epoch schedules a
//!   retry;
//! - a retry timer that outlives a `disconnect()` or a successful
//!   `connect()` is a guaranteed no-op, enforced by an epoch counter rather
//!   than best-effort task abortion.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use palaver_proto::codec;
use palaver_proto::event::{ClientEvent, ServerEvent};

use crate::auth::CredentialProvider;
use crate::transport::{SocketReader, SocketTransport, SocketWriter, TransportError};

/// Errors returned by [`ConnectionManager::connect`].
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// No credential is stored; nothing was opened and no retry scheduled.
    #[error("no credential available")]
    Unauthenticated,

    /// A concurrent `connect` or `disconnect` won the race for this socket.
    #[error("superseded by a concurrent connect or disconnect")]
    Superseded,

    /// The configured endpoint is not a valid URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The transport failed to open or complete the handshake.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The handshake frame could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),
}

/// Errors returned by [`ConnectionManager::send`].
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The connection is not in the `Connected` state.
    #[error("not connected")]
    NotConnected,

    /// The event could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// The socket rejected the frame.
    #[error("transport error: {0}")]
    Transport(TransportError),
}

/// Lifecycle states of the managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket, no pending retry. Terminal until `connect()`.
    Disconnected,
    /// A socket is being opened.
    Connecting,
    /// The socket is open; the handshake frame is in flight.
    Authenticating,
    /// The socket is live; `send` is permitted.
    Connected,
    /// The last socket died; one retry is scheduled.
    Reconnecting {
        /// How many consecutive failures led here; drives the backoff.
        attempt: u32,
    },
}

/// Capped exponential backoff parameters for reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any retry delay.
    pub max_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl ReconnectConfig {
    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`,
    /// capped at `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(2u32.saturating_pow(exp))
            .min(self.max_delay)
    }
}

/// State guarded by the inner mutex.
struct Inner {
    state: ConnectionState,
    /// Socket epoch. Bumped by every `connect()` and `disconnect()`; a
    /// failure signal or retry timer carrying an older epoch is stale.
    epoch: u64,
    /// Consecutive failure count; reset on successful connect.
    attempt: u32,
}

/// Owner of the persistent socket and its recovery policy.
///
/// Constructed via [`ConnectionManager::new`], which also hands out the
/// single subscription to decoded inbound events. All other components go
/// through [`ConnectionManager::send`]; none of them touch the socket.
pub struct ConnectionManager<T: SocketTransport> {
    transport: T,
    credentials: Arc<dyn CredentialProvider>,
    endpoint: String,
    reconnect: ReconnectConfig,
    inner: parking_lot::Mutex<Inner>,
    writer: tokio::sync::Mutex<Option<T::Writer>>,
    events_tx: mpsc::Sender<ServerEvent>,
    /// The single pending retry timer, if any.
    retry: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl<T: SocketTransport> ConnectionManager<T> {
    /// Create a manager and the receiver for decoded inbound events.
    ///
    /// The manager starts `Disconnected`; nothing happens until
    /// [`ConnectionManager::connect`] is called.
    #[must_use]
    pub fn new(
        transport: T,
        credentials: Arc<dyn CredentialProvider>,
        endpoint: impl Into<String>,
        reconnect: ReconnectConfig,
        event_buffer: usize,
    ) -> (Arc<Self>, mpsc::Receiver<ServerEvent>) {
        let (events_tx, events_rx) = mpsc::channel(event_buffer);
        let manager = Arc::new(Self {
            transport,
            credentials,
            endpoint: endpoint.into(),
            reconnect,
            inner: parking_lot::Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                epoch: 0,
                attempt: 0,
            }),
            writer: tokio::sync::Mutex::new(None),
            events_tx,
            retry: parking_lot::Mutex::new(None),
        });
        (manager, events_rx)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// Open the socket, authenticate, and start the reader task.
    ///
    /// No-op when already `Connecting`, `Authenticating`, or `Connected`.
    /// Fails fast with [`ConnectError::Unauthenticated`] when no credential
    /// is stored: no socket is opened and no retry loop starts. Transport
    /// failures schedule a retry before returning the error.
    ///
    /// # Errors
    ///
    /// See [`ConnectError`].
    pub async fn connect(self: &Arc<Self>) -> Result<(), ConnectError> {
        let mut url = url::Url::parse(&self.endpoint)
            .map_err(|e| ConnectError::InvalidEndpoint(e.to_string()))?;

        let (epoch, token) = {
            let mut inner = self.inner.lock();
            match inner.state {
                ConnectionState::Connecting
                | ConnectionState::Authenticating
                | ConnectionState::Connected => return Ok(()),
                ConnectionState::Disconnected | ConnectionState::Reconnecting { .. } => {}
            }
            let Some(credential) = self.credentials.get() else {
                inner.epoch += 1;
                inner.attempt = 0;
                inner.state = ConnectionState::Disconnected;
                drop(inner);
                self.cancel_retry();
                tracing::warn!("connect refused: no stored credential");
                return Err(ConnectError::Unauthenticated);
            };
            inner.epoch += 1;
            inner.state = ConnectionState::Connecting;
            (inner.epoch, credential.access_token)
        };
        self.cancel_retry();

        url.query_pairs_mut().append_pair("token", &token);
        tracing::debug!(epoch, "opening socket");

        let (mut writer, reader) = match self.transport.open(url.as_str()).await {
            Ok(halves) => halves,
            Err(e) => {
                tracing::warn!(epoch, err = %e, "socket open failed");
                self.handle_failure(epoch).await;
                return Err(ConnectError::Transport(e));
            }
        };

        {
            let mut inner = self.inner.lock();
            if inner.epoch != epoch {
                return Err(ConnectError::Superseded);
            }
            inner.state = ConnectionState::Authenticating;
        }

        let handshake =
            codec::encode(&ClientEvent::Ping).map_err(|e| ConnectError::Encode(e.to_string()))?;
        if let Err(e) = writer.send_text(handshake).await {
            tracing::warn!(epoch, err = %e, "handshake send failed");
            self.handle_failure(epoch).await;
            return Err(ConnectError::Transport(e));
        }

        {
            // Promote to Connected and install the writer under the writer
            // lock so a racing disconnect cannot slip between the two.
            let mut slot = self.writer.lock().await;
            let mut inner = self.inner.lock();
            if inner.epoch != epoch {
                return Err(ConnectError::Superseded);
            }
            inner.state = ConnectionState::Connected;
            inner.attempt = 0;
            drop(inner);
            *slot = Some(writer);
        }

        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.read_loop(reader, epoch).await });
        tracing::info!(epoch, "connected");
        Ok(())
    }

    /// Close the socket, cancel any pending retry, and go `Disconnected`.
    pub async fn disconnect(&self) {
        self.cancel_retry();
        {
            let mut inner = self.inner.lock();
            inner.epoch += 1;
            inner.attempt = 0;
            inner.state = ConnectionState::Disconnected;
        }
        if let Some(mut writer) = self.writer.lock().await.take() {
            writer.close().await;
        }
        tracing::info!("disconnected");
    }

    /// Send one outbound event.
    ///
    /// # Errors
    ///
    /// [`SendError::NotConnected`] outside the `Connected` state; otherwise
    /// encoding or transport errors.
    pub async fn send(&self, event: &ClientEvent) -> Result<(), SendError> {
        if !matches!(self.inner.lock().state, ConnectionState::Connected) {
            return Err(SendError::NotConnected);
        }
        let text = codec::encode(event).map_err(|e| SendError::Encode(e.to_string()))?;
        let mut slot = self.writer.lock().await;
        match slot.as_mut() {
            Some(writer) => writer.send_text(text).await.map_err(SendError::Transport),
            None => Err(SendError::NotConnected),
        }
    }

    /// Reader task: decode frames and forward them to the subscriber.
    ///
    /// Decode failures are logged and dropped; the connection stays open.
    /// Clean close, read error, and a dropped subscriber all end the task.
    async fn read_loop(self: Arc<Self>, mut reader: T::Reader, epoch: u64) {
        loop {
            let next = reader.next_text().await;
            if self.inner.lock().epoch != epoch {
                // Socket superseded while we were blocked; stop silently.
                return;
            }
            match next {
                Ok(Some(text)) => match codec::decode(&text) {
                    Ok(event) => {
                        if self.events_tx.send(event).await.is_err() {
                            tracing::debug!("event subscriber dropped, disconnecting");
                            self.disconnect().await;
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(err = %e, "dropping undecodable frame");
                    }
                },
                Ok(None) => {
                    tracing::info!(epoch, "socket closed");
                    break;
                }
                Err(e) => {
                    tracing::warn!(epoch, err = %e, "socket read failed");
                    break;
                }
            }
        }
        self.handle_failure(epoch).await;
    }

    /// React to one failure signal for the socket identified by `epoch`.
    ///
    /// No-op when the epoch is stale or a failure was already handled
    /// (`Reconnecting`) or the manager was shut down (`Disconnected`).
    /// Otherwise schedules exactly one retry after the backoff delay.
    async fn handle_failure(self: &Arc<Self>, epoch: u64) {
        let (attempt, delay) = {
            let mut inner = self.inner.lock();
            if inner.epoch != epoch {
                return;
            }
            match inner.state {
                ConnectionState::Reconnecting { .. } | ConnectionState::Disconnected => return,
                ConnectionState::Connecting
                | ConnectionState::Authenticating
                | ConnectionState::Connected => {}
            }
            inner.attempt += 1;
            inner.state = ConnectionState::Reconnecting {
                attempt: inner.attempt,
            };
            (inner.attempt, self.reconnect.delay_for(inner.attempt))
        };
        if let Some(mut writer) = self.writer.lock().await.take() {
            writer.close().await;
        }
        tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "scheduling reconnect");
        self.schedule_retry(epoch, delay);
    }

    /// Arm the single retry timer, replacing (and aborting) any previous one.
    fn schedule_retry(self: &Arc<Self>, epoch: u64, delay: Duration) {
        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let inner = manager.inner.lock();
                let still_pending =
                    matches!(inner.state, ConnectionState::Reconnecting { .. });
                if inner.epoch != epoch || !still_pending {
                    // A disconnect or a competing connect moved the epoch on;
                    // this timer is stale.
                    return;
                }
            }
            // Remove our own handle so connect's cancel does not abort us
            // mid-attempt.
            manager.retry.lock().take();
            if let Err(e) = Arc::clone(&manager).connect_boxed().await {
                tracing::warn!(err = %e, "reconnect attempt failed");
            }
        });
        let mut slot = self.retry.lock();
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    /// Type-erased `connect`, used by the retry task.
    fn connect_boxed(
        self: Arc<Self>,
    ) -> futures_util::future::BoxFuture<'static, Result<(), ConnectError>> {
        Box::pin(async move { self.connect().await })
    }

    fn cancel_retry(&self) {
        if let Some(handle) = self.retry.lock().take() {
            handle.abort();
        }
    }
}
