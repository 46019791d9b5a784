//! # lovebirds-core
//!
//! Core crate for Lovebirds chat. Contains configuration schemas, typed
//! identifiers, chat data types, domain events, the collaborator traits
//! the real-time core consumes, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Lovebirds crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
