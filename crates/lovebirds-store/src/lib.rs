//! # lovebirds-store
//!
//! In-process stand-in for the external durable store. Implements the
//! [`MessageLog`](lovebirds_core::traits::MessageLog) and
//! [`UserDirectory`](lovebirds_core::traits::UserDirectory) seams so the
//! real-time core can run without a database.

pub mod memory;
pub mod seed;

pub use memory::store::MemoryMessageLog;
pub use seed::Seed;
