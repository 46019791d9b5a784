//! Sidebar synchronization: one bulk snapshot per channel, then deltas.

pub mod recent_chats;
pub mod sidebar;

pub use recent_chats::RecentChatsSynchronizer;
pub use sidebar::SidebarNotifier;
