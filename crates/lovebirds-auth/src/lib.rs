//! # lovebirds-auth
//!
//! The Auth collaborator used by the real-time gateway: verifies signed
//! bearer credentials (signature and expiry) and issues them for
//! development tooling.

pub mod jwt;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
