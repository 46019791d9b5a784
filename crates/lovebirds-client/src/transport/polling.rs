//! Long-polling fallback transport over HTTP.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use lovebirds_core::config::TransportKind;
use lovebirds_core::error::AppError;
use lovebirds_core::result::AppResult;
use lovebirds_core::types::ChannelId;
use lovebirds_realtime::message::types::{InboundMessage, OutboundMessage};

use super::{ChatTransport, Connector, rejection};

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Handshake {
    channel_id: ChannelId,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

/// Opens polling channels under `base_url` (e.g. `http://host:5000/realtime/v1`).
#[derive(Debug, Clone)]
pub struct PollingConnector {
    base_url: String,
    http: reqwest::Client,
}

impl PollingConnector {
    /// Creates a connector.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Connector for PollingConnector {
    async fn connect(&self, token: &str) -> AppResult<Box<dyn ChatTransport>> {
        let response = self
            .http
            .post(format!("{}/poll", self.base_url))
            .json(&serde_json::json!({ "token": token }))
            .send()
            .await
            .map_err(|e| AppError::transport(format!("Polling handshake failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(match response.json::<ErrorBody>().await {
                Ok(body) => rejection(&body.error, &body.message),
                Err(_) => AppError::transport(format!("Polling handshake failed with {status}")),
            });
        }

        let handshake: Envelope<Handshake> = response
            .json()
            .await
            .map_err(|e| AppError::transport(format!("Invalid handshake reply: {e}")))?;
        let channel_id = handshake.data.channel_id;
        let channel_url = format!("{}/poll/{}", self.base_url, channel_id);

        let (tx, rx) = mpsc::channel(256);
        let cancel = CancellationToken::new();
        tokio::spawn(poll_loop(
            self.http.clone(),
            channel_url.clone(),
            tx,
            cancel.clone(),
        ));

        debug!(conn_id = %channel_id, "Polling channel established");
        Ok(Box::new(PollingTransport {
            http: self.http.clone(),
            channel_url,
            channel_id,
            events: rx,
            cancel,
        }))
    }
}

/// Keeps one long-poll in flight, feeding events into `tx` until the
/// channel is gone or `cancel` fires.
async fn poll_loop(
    http: reqwest::Client,
    url: String,
    tx: mpsc::Sender<OutboundMessage>,
    cancel: CancellationToken,
) {
    loop {
        let response = tokio::select! {
            _ = cancel.cancelled() => break,
            response = http.get(&url).send() => response,
        };

        let events = match response {
            Ok(r) if r.status().is_success() => match r.json::<Vec<OutboundMessage>>().await {
                Ok(events) => events,
                Err(e) => {
                    warn!(error = %e, "Undecodable poll response");
                    break;
                }
            },
            Ok(r) => {
                debug!(status = %r.status(), "Polling channel ended");
                break;
            }
            Err(e) => {
                debug!(error = %e, "Poll request failed");
                break;
            }
        };

        for event in events {
            if tx.send(event).await.is_err() {
                return;
            }
        }
    }
}

/// A live polling channel.
#[derive(Debug)]
pub struct PollingTransport {
    http: reqwest::Client,
    channel_url: String,
    channel_id: ChannelId,
    events: mpsc::Receiver<OutboundMessage>,
    cancel: CancellationToken,
}

#[async_trait]
impl ChatTransport for PollingTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Polling
    }

    fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    async fn send(&mut self, msg: &InboundMessage) -> AppResult<()> {
        let response = self
            .http
            .post(&self.channel_url)
            .json(msg)
            .send()
            .await
            .map_err(|e| AppError::transport(format!("Poll send failed: {e}")))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::transport(format!(
                "Poll send rejected with {}",
                response.status()
            )))
        }
    }

    async fn recv(&mut self) -> Option<OutboundMessage> {
        self.events.recv().await
    }

    async fn close(&mut self) {
        self.cancel.cancel();
        let _ = self.http.delete(&self.channel_url).send().await;
    }
}

impl Drop for PollingTransport {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
