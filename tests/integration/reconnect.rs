// Test-specific lint overrides: integration tests use unwrap/expect freely,
// and some pedantic/nursery lints are not appropriate for test code.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::match_same_arms,
    clippy::future_not_send,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::missing_docs_in_private_items
)]

//! Integration tests for connection recovery against real WebSocket servers.
//!
//! Each test runs an in-process scripted server and drives the client's
//! connection manager over an actual socket: token attachment, handshake,
//! event delivery, and reconnection after the server drops the connection.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite as ws;

use palaver::auth::{Credential, MemoryCredentials};
use palaver::connection::{ConnectError, ConnectionManager, ConnectionState, ReconnectConfig};
use palaver::transport::ws::WsTransport;
use palaver_proto::domain::{ChatId, MessageId, UserId};
use palaver_proto::event::ServerEvent;
use uuid::Uuid;

fn fast_backoff() -> ReconnectConfig {
    ReconnectConfig {
        base_delay: Duration::from_millis(50),
        max_delay: Duration::from_millis(400),
    }
}

fn message_frame(n: u128) -> String {
    serde_json::json!({
        "type": "MESSAGE",
        "chat_id": ChatId::from_uuid(Uuid::from_u128(1)),
        "message_id": MessageId::from_uuid(Uuid::from_u128(n)),
        "user": {"user_id": UserId::from_uuid(Uuid::from_u128(2)), "username": "alice"},
        "message": format!("msg {n}"),
        "readers": [],
        "created_at": 100,
        "updated_at": 100,
    })
    .to_string()
}

#[tokio::test]
async fn token_is_attached_as_query_parameter() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (uri_tx, uri_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut uri_tx = Some(uri_tx);
        let callback = move |req: &ws::handshake::server::Request,
                             resp: ws::handshake::server::Response| {
            if let Some(tx) = uri_tx.take() {
                let _ = tx.send(req.uri().to_string());
            }
            Ok(resp)
        };
        let mut ws_stream = tokio_tungstenite::accept_hdr_async(stream, callback)
            .await
            .unwrap();
        // Drain the handshake PING, then hold the socket open.
        let _ = ws_stream.next().await;
        let _ = ws_stream.next().await;
    });

    let (manager, _rx) = ConnectionManager::new(
        WsTransport::default(),
        MemoryCredentials::with(Credential::bearer("sekrit")),
        format!("ws://{addr}"),
        fast_backoff(),
        64,
    );
    manager.connect().await.unwrap();

    let uri = tokio::time::timeout(Duration::from_secs(5), uri_rx)
        .await
        .expect("handshake timed out")
        .unwrap();
    assert!(uri.contains("token=sekrit"), "uri was {uri}");
    assert_eq!(manager.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn handshake_ping_then_events_flow() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws_stream = tokio_tungstenite::accept_async(stream).await.unwrap();

        // First frame must be the PING handshake.
        match ws_stream.next().await {
            Some(Ok(ws::Message::Text(text))) => {
                assert_eq!(text.as_str(), r#"{"type":"PING"}"#);
            }
            other => panic!("expected handshake ping, got {other:?}"),
        }

        ws_stream
            .send(ws::Message::Text(message_frame(10).into()))
            .await
            .unwrap();
        // Hold the socket until the client is done.
        let _ = ws_stream.next().await;
    });

    let (manager, mut rx) = ConnectionManager::new(
        WsTransport::default(),
        MemoryCredentials::with(Credential::bearer("tok")),
        format!("ws://{addr}"),
        fast_backoff(),
        64,
    );
    manager.connect().await.unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("event timed out")
        .unwrap();
    match event {
        ServerEvent::Message { message, .. } => assert_eq!(message, "msg 10"),
        other => panic!("expected Message, got {other:?}"),
    }
}

#[tokio::test]
async fn client_reconnects_after_server_drops_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (accepted_tx, mut accepted_rx) = mpsc::channel::<u32>(4);

    tokio::spawn(async move {
        // First connection: accept, then close straight away.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws_stream = tokio_tungstenite::accept_async(stream).await.unwrap();
        accepted_tx.send(1).await.unwrap();
        let _ = ws_stream.next().await; // handshake ping
        let _ = ws_stream.close(None).await;
        drop(ws_stream);

        // Second connection: accept and hold open.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws_stream = tokio_tungstenite::accept_async(stream).await.unwrap();
        accepted_tx.send(2).await.unwrap();
        let _ = ws_stream.next().await;
        let _ = ws_stream.next().await;
    });

    let (manager, _rx) = ConnectionManager::new(
        WsTransport::default(),
        MemoryCredentials::with(Credential::bearer("tok")),
        format!("ws://{addr}"),
        fast_backoff(),
        64,
    );
    manager.connect().await.unwrap();

    assert_eq!(
        tokio::time::timeout(Duration::from_secs(5), accepted_rx.recv())
            .await
            .expect("first accept timed out"),
        Some(1)
    );
    // The server closes; the client must come back on its own.
    assert_eq!(
        tokio::time::timeout(Duration::from_secs(5), accepted_rx.recv())
            .await
            .expect("client did not reconnect"),
        Some(2)
    );

    // Poll briefly for the state to settle on Connected.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if manager.state() == ConnectionState::Connected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("client never settled on Connected after reconnect");
}

#[tokio::test]
async fn connect_without_credential_never_touches_the_server() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let accepts = Arc::new(std::sync::atomic::AtomicU32::new(0));
    let server_accepts = Arc::clone(&accepts);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            server_accepts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            drop(stream);
        }
    });

    let (manager, _rx) = ConnectionManager::new(
        WsTransport::default(),
        Arc::new(MemoryCredentials::new()),
        format!("ws://{addr}"),
        fast_backoff(),
        64,
    );

    let result = manager.connect().await;
    assert!(matches!(result, Err(ConnectError::Unauthenticated)));
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(accepts.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn disconnect_stops_recovery_for_good() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(std::sync::atomic::AtomicU32::new(0));
    let server_accepts = Arc::clone(&accepts);

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            server_accepts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            // Accept the handshake, then close immediately.
            if let Ok(mut ws_stream) = tokio_tungstenite::accept_async(stream).await {
                let _ = ws_stream.next().await;
                let _ = ws_stream.close(None).await;
            }
        }
    });

    let (manager, _rx) = ConnectionManager::new(
        WsTransport::default(),
        MemoryCredentials::with(Credential::bearer("tok")),
        format!("ws://{addr}"),
        fast_backoff(),
        64,
    );
    manager.connect().await.unwrap();

    // Let at least one recovery cycle happen, then shut down.
    tokio::time::sleep(Duration::from_millis(200)).await;
    manager.disconnect().await;
    let settled = accepts.load(std::sync::atomic::Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(accepts.load(std::sync::atomic::Ordering::SeqCst), settled);
    assert_eq!(manager.state(), ConnectionState::Disconnected);
}
