//! Streaming transport over WebSocket.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use lovebirds_core::config::TransportKind;
use lovebirds_core::error::AppError;
use lovebirds_core::result::AppResult;
use lovebirds_core::types::ChannelId;
use lovebirds_realtime::message::types::{InboundMessage, OutboundMessage};

use super::{ChatTransport, Connector, rejection};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens WebSocket channels at `url` (e.g. `ws://host:5000/realtime/v1/ws`).
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
    handshake_timeout: Duration,
}

impl WsConnector {
    /// Creates a connector with a 10 s handshake timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            handshake_timeout: Duration::from_secs(10),
        }
    }

    /// Overrides the handshake timeout.
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, token: &str) -> AppResult<Box<dyn ChatTransport>> {
        let (socket, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| AppError::transport(format!("WebSocket connect failed: {e}")))?;
        let (mut sink, mut stream) = socket.split();

        let auth = serde_json::to_string(&InboundMessage::Auth {
            token: token.to_string(),
        })?;
        sink.send(Message::Text(auth.into()))
            .await
            .map_err(|e| AppError::transport(format!("Failed to send auth payload: {e}")))?;

        let first = tokio::time::timeout(self.handshake_timeout, next_event(&mut stream))
            .await
            .map_err(|_| AppError::transport("Handshake timed out"))?;

        match first {
            Some(OutboundMessage::Connected { channel_id, .. }) => {
                debug!(conn_id = %channel_id, "WebSocket channel established");
                Ok(Box::new(WsTransport {
                    sink,
                    stream,
                    channel_id,
                }))
            }
            Some(OutboundMessage::ConnectError { code, reason }) => Err(rejection(&code, &reason)),
            Some(other) => Err(AppError::transport(format!(
                "Unexpected handshake reply: {other:?}"
            ))),
            None => Err(AppError::transport("Socket closed during handshake")),
        }
    }
}

/// A live WebSocket channel.
pub struct WsTransport {
    sink: SplitSink<Socket, Message>,
    stream: SplitStream<Socket>,
    channel_id: ChannelId,
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport")
            .field("channel_id", &self.channel_id)
            .finish()
    }
}

#[async_trait]
impl ChatTransport for WsTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Websocket
    }

    fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    async fn send(&mut self, msg: &InboundMessage) -> AppResult<()> {
        let json = serde_json::to_string(msg)?;
        self.sink
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| AppError::transport(format!("WebSocket send failed: {e}")))
    }

    async fn recv(&mut self) -> Option<OutboundMessage> {
        next_event(&mut self.stream).await
    }

    async fn close(&mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }
}

/// Next decodable event; `None` when the socket ends.
async fn next_event(stream: &mut SplitStream<Socket>) -> Option<OutboundMessage> {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str(text.as_str()) {
                Ok(event) => return Some(event),
                Err(e) => warn!(error = %e, "Ignoring undecodable server event"),
            },
            Ok(Message::Close(_)) => return None,
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "WebSocket read failed");
                return None;
            }
        }
    }
    None
}
