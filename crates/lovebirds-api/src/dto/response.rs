//! Response DTOs.

use serde::{Deserialize, Serialize};

use lovebirds_core::config::{ReconnectConfig, TransportKind};
use lovebirds_core::types::{ChannelId, UserId};
use lovebirds_realtime::metrics::MetricsSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since start.
    pub uptime_seconds: i64,
    /// Users with at least one live channel.
    pub online_users: usize,
    /// Channel counters.
    pub realtime: MetricsSnapshot,
    /// Product feature flags.
    pub features: Vec<String>,
}

/// Transport negotiation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiateResponse {
    /// Versioned mount point.
    pub path: String,
    /// Enabled transports, preferred first.
    pub transports: Vec<TransportKind>,
    /// Server ping interval.
    pub ping_interval_seconds: u64,
    /// Silence tolerated after a ping.
    pub ping_timeout_seconds: u64,
    /// How long a poll request is held open.
    pub poll_wait_seconds: u64,
    /// Recommended client reconnection policy.
    pub reconnect: ReconnectConfig,
}

/// Polling handshake response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollHandshakeResponse {
    /// Channel to poll.
    pub channel_id: ChannelId,
    /// Authenticated user.
    pub user_id: UserId,
    /// How long each poll is held open.
    pub poll_wait_seconds: u64,
}
