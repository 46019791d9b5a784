//! # lovebirds-realtime
//!
//! Real-time connection and delivery core for Lovebirds chat. Provides:
//!
//! - Credential shape checking and the authenticated connection gateway
//! - A session registry mapping users to their live channels (multi-device)
//! - Typing signal relay with expiry, and online presence announcements
//! - Recent-chats snapshots plus incremental sidebar pushes
//! - Channel heartbeat, polling-transport queues and engine metrics

pub mod connection;
pub mod message;
pub mod metrics;
pub mod presence;
pub mod server;
pub mod session;
pub mod sync;
pub mod transport;

pub use connection::gateway::ConnectionGateway;
pub use connection::manager::ConnectionManager;
pub use presence::broadcaster::TypingBroadcaster;
pub use server::RealtimeEngine;
pub use session::registry::SessionRegistry;
pub use sync::recent_chats::RecentChatsSynchronizer;
pub use sync::sidebar::SidebarNotifier;
