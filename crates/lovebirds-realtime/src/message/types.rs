//! Inbound and outbound channel event definitions.
//!
//! Every frame is `{"event": <name>, "data": <payload>}`; event names and
//! payload fields are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lovebirds_core::config::TransportKind;
use lovebirds_core::error::AppError;
use lovebirds_core::events::SidebarEvent;
use lovebirds_core::types::{ChannelId, ConversationId, ConversationSummary, MessageId, UserId};

/// Events sent by the client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum InboundMessage {
    /// Handshake auth payload; first frame on the streaming transport.
    Auth {
        /// Bearer credential.
        token: String,
    },
    /// Request a recent-chats snapshot.
    LoadRecentChats,
    /// Typing started/refreshed (`active`) or stopped.
    SignalTyping {
        /// Conversation being typed in.
        conversation_id: ConversationId,
        /// Whether the user is typing.
        active: bool,
    },
    /// Store a new message.
    SendMessage {
        /// Target conversation.
        conversation_id: ConversationId,
        /// Message text.
        body: String,
        /// Opaque client correlation value echoed in the ack.
        #[serde(default)]
        client_ref: Option<String>,
    },
    /// Mark a conversation as read.
    MarkConversationRead {
        /// Conversation ID.
        conversation_id: ConversationId,
    },
    /// Reply to a server ping.
    Pong {
        /// Echoed timestamp.
        #[serde(default)]
        timestamp: i64,
    },
}

impl InboundMessage {
    /// Wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::LoadRecentChats => "loadRecentChats",
            Self::SignalTyping { .. } => "signalTyping",
            Self::SendMessage { .. } => "sendMessage",
            Self::MarkConversationRead { .. } => "markConversationRead",
            Self::Pong { .. } => "pong",
        }
    }
}

/// Events sent by the server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum OutboundMessage {
    /// Handshake accepted.
    Connected {
        /// The new channel.
        channel_id: ChannelId,
        /// Authenticated user.
        user_id: UserId,
        /// Transport carrying the channel.
        transport: TransportKind,
    },
    /// Full sidebar snapshot, most recent first.
    RecentChatsLoaded(Vec<ConversationSummary>),
    /// Incremental sidebar update for one stored message.
    NewMessageForSidebar(SidebarEvent),
    /// Another participant started or stopped typing.
    UserTyping {
        /// Conversation ID.
        conversation_id: ConversationId,
        /// Who is typing.
        typing_user_id: UserId,
        /// Whether they are typing.
        active: bool,
    },
    /// A conversation partner came online or went offline.
    PresenceChanged {
        /// User ID.
        user_id: UserId,
        /// Whether the user has at least one live channel.
        online: bool,
    },
    /// A `sendMessage` was stored.
    MessageSent {
        /// Conversation ID.
        conversation_id: ConversationId,
        /// Assigned message ID.
        message_id: MessageId,
        /// Echo of the client correlation value.
        client_ref: Option<String>,
        /// Storage timestamp.
        sent_at: DateTime<Utc>,
    },
    /// Handshake or credential failure; the channel is closed after this.
    ConnectError {
        /// Error code.
        code: String,
        /// Human-readable reason.
        reason: String,
    },
    /// Non-fatal per-event failure.
    Error {
        /// Error code.
        code: String,
        /// Error description.
        message: String,
    },
    /// Server keepalive.
    Ping {
        /// Server timestamp (ms since epoch).
        timestamp: i64,
    },
}

impl OutboundMessage {
    /// Builds a terminal connection error from an application error.
    pub fn connect_error(err: &AppError) -> Self {
        Self::ConnectError {
            code: err.kind.code().to_string(),
            reason: err.message.clone(),
        }
    }

    /// Builds a non-fatal error event from an application error.
    pub fn error(err: &AppError) -> Self {
        Self::Error {
            code: err.kind.code().to_string(),
            message: err.message.clone(),
        }
    }

    /// Serializes to a JSON text frame.
    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string(self)?)
    }
}
