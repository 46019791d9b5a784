//! Client transports.
//!
//! A [`Connector`] performs the handshake and yields a live
//! [`ChatTransport`]. Handshake rejections carry the server's error kind so
//! callers can tell a dead credential from a network problem.

pub mod fallback;
pub mod polling;
pub mod ws;

use async_trait::async_trait;

use lovebirds_core::config::TransportKind;
use lovebirds_core::error::{AppError, ErrorKind};
use lovebirds_core::result::AppResult;
use lovebirds_core::types::ChannelId;
use lovebirds_realtime::message::types::{InboundMessage, OutboundMessage};

pub use fallback::FallbackConnector;
pub use polling::PollingConnector;
pub use ws::WsConnector;

/// An established channel.
///
/// `recv` must be cancel-safe: the controller polls it inside `select!`.
#[async_trait]
pub trait ChatTransport: Send {
    /// Transport kind.
    fn kind(&self) -> TransportKind;

    /// Server-assigned channel.
    fn channel_id(&self) -> ChannelId;

    /// Sends one event.
    async fn send(&mut self, msg: &InboundMessage) -> AppResult<()>;

    /// Next server event; `None` once the channel is gone.
    async fn recv(&mut self) -> Option<OutboundMessage>;

    /// Closes the channel voluntarily.
    async fn close(&mut self);
}

/// Opens channels.
#[async_trait]
pub trait Connector: Send + Sync + std::fmt::Debug + 'static {
    /// Performs the handshake with `token`.
    async fn connect(&self, token: &str) -> AppResult<Box<dyn ChatTransport>>;
}

/// Converts a `connectError` payload into an error of the matching kind.
pub fn rejection(code: &str, reason: &str) -> AppError {
    let kind = ErrorKind::from_code(code).unwrap_or(ErrorKind::Internal);
    AppError::new(kind, reason)
}
