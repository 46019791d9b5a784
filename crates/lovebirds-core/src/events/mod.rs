//! Domain events emitted by the message log and consumed by live channels.

pub mod message;

pub use message::SidebarEvent;
