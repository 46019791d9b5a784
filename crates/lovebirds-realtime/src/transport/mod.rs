//! Transport-side buffering.
//!
//! Streaming channels drain their outbound queue directly from the socket
//! task; polling channels park it here between requests.

pub mod polling;

pub use polling::{PollingChannel, PollingChannels};
