//! Client-visible connection state.

use std::time::Duration;

use lovebirds_core::config::TransportKind;
use lovebirds_core::types::ChannelId;

/// Where the client's channel currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// First connection attempt in progress.
    Connecting,
    /// Channel established.
    Connected {
        /// Server-assigned channel.
        channel_id: ChannelId,
        /// Transport in use.
        transport: TransportKind,
    },
    /// Waiting before the next attempt after a drop or failed attempt.
    Reconnecting {
        /// 1-based attempt about to be made.
        attempt: u32,
        /// Delay before it.
        delay: Duration,
    },
    /// The credential was rejected; it must be discarded.
    LoggedOut {
        /// Server-provided reason.
        reason: String,
    },
    /// The server replaced or refused the channel for a non-credential
    /// reason; not retried.
    Rejected {
        /// Wire error code.
        code: String,
        /// Server-provided reason.
        reason: String,
    },
    /// Attempts exhausted.
    Failed {
        /// Attempts made.
        attempts: u32,
    },
    /// Closed by the application.
    Closed,
}

impl ConnectionState {
    /// Whether no further connection attempts will be made.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::LoggedOut { .. } | Self::Rejected { .. } | Self::Failed { .. } | Self::Closed
        )
    }
}
