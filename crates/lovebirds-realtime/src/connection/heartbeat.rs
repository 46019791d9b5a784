//! Channel keepalive: pings, liveness checks and credential expiry.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

use lovebirds_core::config::{RealtimeConfig, TransportKind};

use crate::message::types::OutboundMessage;

use super::handle::ConnectionHandle;
use super::manager::ConnectionManager;

/// Heartbeat configuration
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between checks (and pings on streaming channels)
    pub ping_interval: Duration,
    /// Streaming channel is dropped after this long without any frame
    pub stream_timeout: Duration,
    /// Polling channel is dropped after this long without a poll
    pub poll_idle_timeout: Duration,
}

impl HeartbeatConfig {
    /// Silence allowed before a channel of `transport` counts as dropped.
    pub fn timeout_for(&self, transport: TransportKind) -> Duration {
        match transport {
            TransportKind::Websocket => self.stream_timeout,
            TransportKind::Polling => self.poll_idle_timeout,
        }
    }
}

impl From<&RealtimeConfig> for HeartbeatConfig {
    fn from(config: &RealtimeConfig) -> Self {
        let ping_interval = Duration::from_secs(config.ping_interval_seconds);
        Self {
            ping_interval,
            stream_timeout: ping_interval + Duration::from_secs(config.ping_timeout_seconds),
            poll_idle_timeout: Duration::from_secs(config.poll_idle_timeout_seconds),
        }
    }
}

/// Why a heartbeat check ended the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Keep going.
    Alive,
    /// No frame or poll within the timeout.
    TimedOut,
    /// The handshake credential has expired.
    CredentialExpired,
}

/// Checks one channel against the heartbeat rules.
pub async fn check(handle: &ConnectionHandle, config: &HeartbeatConfig) -> Liveness {
    let now = Utc::now();
    if handle.credential_expired(now) {
        return Liveness::CredentialExpired;
    }

    let silence = (now - handle.last_seen().await).to_std().unwrap_or_default();
    if silence > config.timeout_for(handle.transport) {
        return Liveness::TimedOut;
    }

    Liveness::Alive
}

/// Run heartbeat loop for a channel until it closes.
///
/// Pings streaming channels every interval. A channel that stays silent
/// past its timeout is closed as a transport drop; an expired credential
/// forces a logout of that channel.
pub async fn run_heartbeat(
    manager: Arc<ConnectionManager>,
    handle: Arc<ConnectionHandle>,
    config: HeartbeatConfig,
) {
    let mut interval = time::interval_at(Instant::now() + config.ping_interval, config.ping_interval);

    loop {
        tokio::select! {
            _ = handle.closed() => break,
            _ = interval.tick() => {}
        }

        match check(&handle, &config).await {
            Liveness::Alive => {}
            Liveness::TimedOut => {
                warn!(conn_id = %handle.id, transport = handle.transport.as_str(), "Channel heartbeat timeout");
                manager.close(&handle.id, "heartbeat timeout").await;
                break;
            }
            Liveness::CredentialExpired => {
                warn!(conn_id = %handle.id, user_id = %handle.user_id, "Credential expired on live channel");
                manager.expire_credential(&handle).await;
                break;
            }
        }

        if handle.transport == TransportKind::Websocket {
            let ping = OutboundMessage::Ping {
                timestamp: Utc::now().timestamp_millis(),
            };
            if !handle.send(ping) && !handle.is_alive() {
                manager.close(&handle.id, "ping send failed").await;
                break;
            }
        }
    }

    debug!(conn_id = %handle.id, "Heartbeat loop ended");
}
