//! # lovebirds-client
//!
//! Client-side collaborator of the real-time channel. Provides:
//!
//! - [`ReconnectPolicy`]: bounded exponential backoff
//! - [`ChatClient`]: keeps a channel alive across drops, re-requests the
//!   recent-chats snapshot after every (re)connection, and treats
//!   credential rejections as a logout
//! - Streaming (WebSocket) and polling transports, plus a connector that
//!   falls back from the first to the second

pub mod controller;
pub mod policy;
pub mod state;
pub mod transport;

pub use controller::ChatClient;
pub use policy::ReconnectPolicy;
pub use state::ConnectionState;
