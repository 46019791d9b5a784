//! Real-time channel configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Transports a channel may be carried over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Persistent message stream (WebSocket).
    Websocket,
    /// HTTP long-polling fallback.
    Polling,
}

impl TransportKind {
    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Websocket => "websocket",
            Self::Polling => "polling",
        }
    }
}

/// Real-time engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Fixed, versioned mount point of the channel endpoints.
    #[serde(default = "default_handshake_path")]
    pub handshake_path: String,
    /// Enabled transports, in order of preference.
    #[serde(default = "default_transports")]
    pub transports: Vec<TransportKind>,
    /// Outbound queue depth per channel.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Maximum live channels per user; the oldest is evicted beyond this.
    #[serde(default = "default_max_channels_per_user")]
    pub max_channels_per_user: usize,
    /// Seconds a streaming client has to send its auth payload.
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_seconds: u64,
    /// Delay before the initial recent-chats push after a handshake.
    #[serde(default = "default_sync_debounce")]
    pub sync_debounce_ms: u64,
    /// Typing state expires when not refreshed within this window.
    #[serde(default = "default_typing_timeout")]
    pub typing_timeout_ms: u64,
    /// How often expired typing states are swept.
    #[serde(default = "default_typing_sweep")]
    pub typing_sweep_interval_ms: u64,
    /// Server ping interval in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Seconds without a pong before a channel is considered dropped.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_seconds: u64,
    /// Seconds a long-poll request waits for events before returning empty.
    #[serde(default = "default_poll_wait")]
    pub poll_wait_seconds: u64,
    /// Seconds without a poll before a polling channel is disconnected.
    #[serde(default = "default_poll_idle_timeout")]
    pub poll_idle_timeout_seconds: u64,
    /// Maximum inbound frame size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Maximum stored message body length in characters.
    #[serde(default = "default_max_body_length")]
    pub max_body_length: usize,
    /// Characters of a message body carried in sidebar previews.
    #[serde(default = "default_preview_length")]
    pub preview_length: usize,
    /// Client reconnection defaults advertised by the negotiate endpoint.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl RealtimeConfig {
    /// Typing expiry window.
    pub fn typing_timeout(&self) -> Duration {
        Duration::from_millis(self.typing_timeout_ms)
    }

    /// Initial synchronization debounce.
    pub fn sync_debounce(&self) -> Duration {
        Duration::from_millis(self.sync_debounce_ms)
    }

    /// Whether a transport is enabled.
    pub fn allows(&self, transport: TransportKind) -> bool {
        self.transports.contains(&transport)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            handshake_path: default_handshake_path(),
            transports: default_transports(),
            channel_buffer_size: default_channel_buffer(),
            max_channels_per_user: default_max_channels_per_user(),
            handshake_timeout_seconds: default_handshake_timeout(),
            sync_debounce_ms: default_sync_debounce(),
            typing_timeout_ms: default_typing_timeout(),
            typing_sweep_interval_ms: default_typing_sweep(),
            ping_interval_seconds: default_ping_interval(),
            ping_timeout_seconds: default_ping_timeout(),
            poll_wait_seconds: default_poll_wait(),
            poll_idle_timeout_seconds: default_poll_idle_timeout(),
            max_message_size: default_max_message_size(),
            max_body_length: default_max_body_length(),
            preview_length: default_preview_length(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Client reconnection policy: bounded exponential backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// First retry delay in milliseconds.
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
    /// Upper bound for the retry delay in milliseconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    /// Attempts before a permanent failure is surfaced.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_handshake_path() -> String {
    "/realtime/v1".to_string()
}

fn default_transports() -> Vec<TransportKind> {
    vec![TransportKind::Websocket, TransportKind::Polling]
}

fn default_channel_buffer() -> usize {
    256
}

fn default_max_channels_per_user() -> usize {
    5
}

fn default_handshake_timeout() -> u64 {
    10
}

fn default_sync_debounce() -> u64 {
    100
}

fn default_typing_timeout() -> u64 {
    5_000
}

fn default_typing_sweep() -> u64 {
    1_000
}

fn default_ping_interval() -> u64 {
    25
}

fn default_ping_timeout() -> u64 {
    20
}

fn default_poll_wait() -> u64 {
    25
}

fn default_poll_idle_timeout() -> u64 {
    45
}

fn default_max_message_size() -> usize {
    65_536
}

fn default_max_body_length() -> usize {
    4_000
}

fn default_preview_length() -> usize {
    80
}

fn default_base_delay() -> u64 {
    1_000
}

fn default_max_delay() -> u64 {
    5_000
}

fn default_max_attempts() -> u32 {
    5
}
