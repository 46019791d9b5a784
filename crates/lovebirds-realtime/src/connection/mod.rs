//! Channel connection management: credential checks, gateway, handles,
//! event dispatch, heartbeat.

pub mod gateway;
pub mod handle;
pub mod heartbeat;
pub mod manager;
pub mod validator;

pub use handle::ConnectionHandle;
pub use manager::ConnectionManager;
