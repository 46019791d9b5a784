//! Collaborator traits consumed by the real-time core.
//!
//! Implementations live in other crates (`lovebirds-auth`,
//! `lovebirds-store`); the core only ever sees these seams.

pub mod auth;
pub mod directory;
pub mod message_log;

pub use auth::{CredentialVerifier, VerifiedIdentity};
pub use directory::UserDirectory;
pub use message_log::MessageLog;
