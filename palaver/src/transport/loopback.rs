//! Scriptable in-process transport for testing.
//!
//! Each [`SocketTransport::open`] call either fails (when scripted to) or
//! produces a socket whose server side is driven by the test through a
//! [`LoopbackConn`] handle: the test delivers inbound frames, injects
//! failures or clean closes, and inspects everything the client sent.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::{SocketReader, SocketTransport, SocketWriter, TransportError};

/// What the server side pushes into a loopback socket's read half.
enum ServerSignal {
    /// A text frame for the client.
    Frame(String),
    /// Clean close.
    Close,
    /// Transport failure.
    Fail,
}

struct Shared {
    /// How many upcoming `open` calls should be refused.
    refuse_opens: parking_lot::Mutex<u32>,
    /// Every accepted connection, in open order.
    conns: parking_lot::Mutex<Vec<LoopbackConn>>,
}

/// In-process [`SocketTransport`] whose server side is the test itself.
///
/// Clones share state, so a clone handed to the connection manager can be
/// driven through the original.
#[derive(Clone)]
pub struct LoopbackTransport {
    shared: Arc<Shared>,
}

impl LoopbackTransport {
    /// Create a transport that accepts every `open` until told otherwise.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                refuse_opens: parking_lot::Mutex::new(0),
                conns: parking_lot::Mutex::new(Vec::new()),
            }),
        }
    }

    /// Refuse the next `n` `open` calls with [`TransportError::ConnectionClosed`].
    pub fn refuse_next_opens(&self, n: u32) {
        *self.shared.refuse_opens.lock() = n;
    }

    /// Number of `open` calls that were accepted.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.shared.conns.lock().len()
    }

    /// Handle to the `index`-th accepted connection.
    #[must_use]
    pub fn connection(&self, index: usize) -> Option<LoopbackConn> {
        self.shared.conns.lock().get(index).cloned()
    }

    /// Handle to the most recently accepted connection.
    #[must_use]
    pub fn last_connection(&self) -> Option<LoopbackConn> {
        self.shared.conns.lock().last().cloned()
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SocketTransport for LoopbackTransport {
    type Writer = LoopbackWriter;
    type Reader = LoopbackReader;

    async fn open(&self, url: &str) -> Result<(Self::Writer, Self::Reader), TransportError> {
        {
            let mut refuse = self.shared.refuse_opens.lock();
            if *refuse > 0 {
                *refuse -= 1;
                return Err(TransportError::ConnectionClosed);
            }
        }

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let sent = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let conn = LoopbackConn {
            url: url.to_string(),
            sent: Arc::clone(&sent),
            server_tx,
        };
        self.shared.conns.lock().push(conn);

        Ok((LoopbackWriter { sent }, LoopbackReader { rx: server_rx }))
    }
}

/// Test-side handle to one accepted loopback connection.
#[derive(Clone)]
pub struct LoopbackConn {
    url: String,
    sent: Arc<parking_lot::Mutex<Vec<String>>>,
    server_tx: mpsc::UnboundedSender<ServerSignal>,
}

impl LoopbackConn {
    /// The URL the client opened this connection with.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Every text frame the client has sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Deliver a text frame to the client's read half.
    pub fn deliver(&self, text: impl Into<String>) {
        let _ = self.server_tx.send(ServerSignal::Frame(text.into()));
    }

    /// Close the connection cleanly from the server side.
    pub fn close(&self) {
        let _ = self.server_tx.send(ServerSignal::Close);
    }

    /// Fail the connection from the server side.
    pub fn fail(&self) {
        let _ = self.server_tx.send(ServerSignal::Fail);
    }
}

/// Write half of a loopback socket; records every frame.
pub struct LoopbackWriter {
    sent: Arc<parking_lot::Mutex<Vec<String>>>,
}

impl SocketWriter for LoopbackWriter {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.sent.lock().push(text);
        Ok(())
    }

    async fn close(&mut self) {}
}

/// Read half of a loopback socket; yields whatever the test scripted.
pub struct LoopbackReader {
    rx: mpsc::UnboundedReceiver<ServerSignal>,
}

impl SocketReader for LoopbackReader {
    async fn next_text(&mut self) -> Result<Option<String>, TransportError> {
        match self.rx.recv().await {
            Some(ServerSignal::Frame(text)) => Ok(Some(text)),
            Some(ServerSignal::Close) | None => Ok(None),
            Some(ServerSignal::Fail) => Err(TransportError::ConnectionClosed),
        }
    }
}
