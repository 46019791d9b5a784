//! Session registry: which live channels belong to which user.

pub mod registry;

pub use registry::{Session, SessionRegistry};
