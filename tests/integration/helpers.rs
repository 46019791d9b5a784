//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use lovebirds_api::state::AppState;
use lovebirds_auth::{JwtDecoder, JwtEncoder};
use lovebirds_core::config::AppConfig;
use lovebirds_core::types::UserId;
use lovebirds_realtime::server::RealtimeEngine;
use lovebirds_store::MemoryMessageLog;

/// How long a test waits for an expected event.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A server running on an ephemeral local port.
pub struct TestServer {
    /// Bound address.
    pub addr: SocketAddr,
    /// Effective configuration.
    pub config: AppConfig,
    /// Backing message store, for seeding.
    pub store: Arc<MemoryMessageLog>,
    /// The running engine.
    pub engine: Arc<RealtimeEngine>,
    encoder: JwtEncoder,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Starts a server with test defaults.
    pub async fn start() -> Self {
        Self::with_config(test_config()).await
    }

    /// Starts a server with the given configuration.
    pub async fn with_config(config: AppConfig) -> Self {
        let store = Arc::new(MemoryMessageLog::new().with_preview_length(config.realtime.preview_length));
        let engine = Arc::new(RealtimeEngine::new(
            config.realtime.clone(),
            Arc::new(JwtDecoder::new(&config.auth)),
            store.clone(),
            store.clone(),
        ));
        engine.start();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let state = AppState::new(Arc::new(config.clone()), engine.clone());
        let shutdown_engine = engine.clone();
        tokio::spawn(async move {
            let _ = lovebirds_api::app::serve(listener, state, async move {
                let _ = shutdown_rx.await;
                shutdown_engine.shutdown().await;
            })
            .await;
        });

        Self {
            addr,
            encoder: JwtEncoder::new(&config.auth),
            config,
            store,
            engine,
            shutdown: Some(shutdown_tx),
        }
    }

    /// Registers a user and returns a valid credential for them.
    pub async fn user(&self, name: &str) -> (UserId, String) {
        let user_id = UserId::new();
        self.store.add_user(user_id, name).await;
        (user_id, self.token(user_id, name))
    }

    /// Issues a credential for an existing user.
    pub fn token(&self, user_id: UserId, name: &str) -> String {
        self.encoder.issue(user_id, name).expect("Failed to issue token")
    }

    /// Issues an already-expired credential.
    pub fn expired_token(&self, user_id: UserId, name: &str) -> String {
        self.encoder
            .issue_with_ttl(user_id, name, chrono::Duration::minutes(-10))
            .expect("Failed to issue token")
    }

    /// HTTP base of the channel endpoints.
    pub fn http_base(&self) -> String {
        format!("http://{}{}", self.addr, self.config.realtime.handshake_path)
    }

    /// Streaming endpoint URL.
    pub fn ws_url(&self) -> String {
        format!("ws://{}{}/ws", self.addr, self.config.realtime.handshake_path)
    }

    /// Opens a raw WebSocket and sends the auth frame.
    pub async fn ws_connect(&self, token: &str) -> WsClient {
        let (stream, _) = tokio_tungstenite::connect_async(self.ws_url())
            .await
            .expect("WebSocket connect failed");
        let mut client = WsClient::from_stream(stream);
        client
            .send(json!({ "event": "auth", "data": { "token": token } }))
            .await;
        client
    }

    /// Opens a WebSocket and waits for `connected`; returns the channel ID.
    pub async fn ws_session(&self, token: &str) -> (WsClient, String) {
        let mut client = self.ws_connect(token).await;
        let connected = client.expect("connected").await;
        let channel_id = connected["channelId"]
            .as_str()
            .expect("connected without channelId")
            .to_string();
        (client, channel_id)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Test configuration: fast debounce and a short poll wait.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.realtime.sync_debounce_ms = 300;
    config.realtime.poll_wait_seconds = 1;
    config.realtime.handshake_timeout_seconds = 2;
    config
}

/// Raw WebSocket client speaking the `{event, data}` protocol.
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Wraps an already-open socket.
    pub fn from_stream(stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        Self { stream }
    }

    /// Sends one event frame.
    pub async fn send(&mut self, frame: Value) {
        self.stream
            .send(Message::Text(frame.to_string().into()))
            .await
            .expect("WebSocket send failed");
    }

    /// Sends a raw text frame.
    pub async fn send_raw(&mut self, text: &str) {
        self.stream
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("WebSocket send failed");
    }

    /// Next event frame, or `None` when the socket closes or nothing
    /// arrives in time.
    pub async fn next_event(&mut self, within: Duration) -> Option<Value> {
        let deadline = tokio::time::Instant::now() + within;
        loop {
            let frame = tokio::time::timeout_at(deadline, self.stream.next())
                .await
                .ok()??;
            match frame {
                Ok(Message::Text(text)) => {
                    return Some(serde_json::from_str(text.as_str()).expect("Invalid JSON frame"));
                }
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
    }

    /// Waits for the named event and returns its `data`, skipping others.
    pub async fn expect(&mut self, event: &str) -> Value {
        loop {
            let frame = self
                .next_event(EVENT_TIMEOUT)
                .await
                .unwrap_or_else(|| panic!("Timed out waiting for {event}"));
            if frame["event"] == event {
                return frame["data"].clone();
            }
        }
    }

    /// Collects every named event arriving within `within`.
    pub async fn collect(&mut self, event: &str, within: Duration) -> Vec<Value> {
        let deadline = tokio::time::Instant::now() + within;
        let mut found = Vec::new();
        while let Some(frame) = self
            .next_event(deadline.saturating_duration_since(tokio::time::Instant::now()))
            .await
        {
            if frame["event"] == event {
                found.push(frame["data"].clone());
            }
        }
        found
    }

    /// Whether the server closed the socket within `within`.
    pub async fn closed_within(&mut self, within: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + within;
        loop {
            match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Err(_) => return false,
                Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return true,
                Ok(Some(Ok(_))) => continue,
            }
        }
    }

    /// Closes the socket.
    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}

/// Waits until `check` holds, polling every 10ms for up to [`EVENT_TIMEOUT`].
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + EVENT_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
