//! # lovebirds-api
//!
//! HTTP layer for Lovebirds built on Axum.
//!
//! Mounts the real-time channel under its versioned path: WebSocket
//! streaming, the long-polling fallback and transport negotiation. Also
//! serves health/metrics, CORS and request tracing, and maps `AppError`
//! to HTTP responses.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use state::AppState;
