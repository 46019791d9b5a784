//! Request handlers.

pub mod health;
pub mod negotiate;
pub mod polling;
pub mod ws;
