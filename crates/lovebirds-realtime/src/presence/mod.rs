//! Ephemeral presence: typing signals and online status.

pub mod broadcaster;
pub mod tracker;
pub mod typing;

pub use broadcaster::TypingBroadcaster;
pub use tracker::PresenceTracker;
pub use typing::{TypingTracker, TypingTransition};
