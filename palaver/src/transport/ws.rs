//! WebSocket transport backed by `tokio-tungstenite`.
//!
//! Opens one socket per [`SocketTransport::open`] call, splits it into a
//! write half and a read half, and surfaces only text frames to the caller.
//! Control frames (ping/pong) and binary frames are consumed and ignored;
//! a `Close` frame or stream end maps to the clean-close signal.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::{SocketReader, SocketTransport, SocketWriter, TransportError};

/// Type alias for the write half of a WebSocket connection.
type WsSink = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

/// Type alias for the read half of a WebSocket connection.
type WsStream =
    futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// WebSocket implementation of [`SocketTransport`].
#[derive(Debug, Clone)]
pub struct WsTransport {
    /// Timeout applied to the connection handshake.
    connect_timeout: Duration,
}

impl WsTransport {
    /// Create a transport with the given handshake timeout.
    #[must_use]
    pub const fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl SocketTransport for WsTransport {
    type Writer = WsWriter;
    type Reader = WsReader;

    async fn open(&self, url: &str) -> Result<(Self::Writer, Self::Reader), TransportError> {
        let (stream, _response) = tokio::time::timeout(self.connect_timeout, connect_async(url))
            .await
            .map_err(|_| {
                tracing::warn!(url, "WebSocket connect timed out");
                TransportError::Timeout
            })?
            .map_err(|e| {
                tracing::warn!(url, err = %e, "WebSocket connect failed");
                map_ws_connect_error(e)
            })?;

        let (sink, stream) = stream.split();
        Ok((WsWriter { sink }, WsReader { stream }))
    }
}

/// Write half of a WebSocket socket.
pub struct WsWriter {
    sink: WsSink,
}

impl SocketWriter for WsWriter {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| {
                tracing::warn!(err = %e, "WebSocket send failed");
                TransportError::ConnectionClosed
            })
    }

    async fn close(&mut self) {
        let _ = self.sink.close().await;
    }
}

/// Read half of a WebSocket socket.
pub struct WsReader {
    stream: WsStream,
}

impl SocketReader for WsReader {
    async fn next_text(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.to_string())),
                Some(Ok(Message::Close(_))) => {
                    tracing::info!("WebSocket closed by server");
                    return Ok(None);
                }
                Some(Ok(
                    Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_),
                )) => {
                    // Control and binary frames carry nothing for us.
                }
                Some(Err(e)) => {
                    tracing::warn!(err = %e, "WebSocket read error");
                    return Err(TransportError::ConnectionClosed);
                }
                None => return Ok(None),
            }
        }
    }
}

/// Map a `tokio_tungstenite` connection error to a [`TransportError`].
fn map_ws_connect_error(err: tokio_tungstenite::tungstenite::Error) -> TransportError {
    use tokio_tungstenite::tungstenite::Error as WsError;
    match err {
        WsError::Io(io_err) => TransportError::Io(io_err),
        WsError::Url(e) => TransportError::InvalidEndpoint(e.to_string()),
        WsError::Http(response) => TransportError::Io(std::io::Error::other(format!(
            "server rejected handshake: status {}",
            response.status()
        ))),
        other => TransportError::Io(std::io::Error::other(format!(
            "WebSocket connection error: {other}"
        ))),
    }
}
