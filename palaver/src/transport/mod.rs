//! Socket transport abstraction for the Palaver client.
//!
//! Defines the [`SocketTransport`] trait family the connection manager is
//! written against. Concrete implementations:
//! - [`ws::WsTransport`] — WebSocket transport over `tokio-tungstenite`
//! - [`loopback::LoopbackTransport`] — in-process scriptable transport for
//!   testing connection behaviour without a network

pub mod loopback;
pub mod ws;

/// Errors that can occur during transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The socket has been closed or refused.
    #[error("connection closed")]
    ConnectionClosed,

    /// The operation timed out before completing.
    #[error("transport operation timed out")]
    Timeout,

    /// The endpoint URL could not be parsed or resolved.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// An underlying I/O error occurred.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Factory for persistent bidirectional text-frame sockets.
///
/// The connection manager owns exactly one live socket at a time; it calls
/// [`SocketTransport::open`] on every (re)connection attempt and drops both
/// halves when the socket dies.
pub trait SocketTransport: Send + Sync + 'static {
    /// Write half produced by [`SocketTransport::open`].
    type Writer: SocketWriter;
    /// Read half produced by [`SocketTransport::open`].
    type Reader: SocketReader;

    /// Open a new socket to `url` and return its two halves.
    fn open(
        &self,
        url: &str,
    ) -> impl std::future::Future<Output = Result<(Self::Writer, Self::Reader), TransportError>> + Send;
}

/// Write half of an open socket.
pub trait SocketWriter: Send + 'static {
    /// Send one text frame.
    ///
    /// Returns `Ok(())` when the frame has been handed off to the socket;
    /// this does not guarantee delivery.
    fn send_text(
        &mut self,
        text: String,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Close the socket gracefully. Errors are ignored; the socket is
    /// considered gone either way.
    fn close(&mut self) -> impl std::future::Future<Output = ()> + Send;
}

/// Read half of an open socket.
pub trait SocketReader: Send + 'static {
    /// Wait for the next text frame.
    ///
    /// `Ok(Some(text))` is a frame, `Ok(None)` is a clean close (the server
    /// or the peer shut the socket down), `Err` is a transport failure.
    /// Both terminal outcomes are treated as the same failure signal by the
    /// connection manager.
    fn next_text(
        &mut self,
    ) -> impl std::future::Future<Output = Result<Option<String>, TransportError>> + Send;
}
