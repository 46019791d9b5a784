//! Memory-backed implementations.

pub mod store;
