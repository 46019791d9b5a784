//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section; every field carries a serde default so an empty file (or no
//! file at all) yields a runnable development configuration.

pub mod app;
pub mod auth;
pub mod logging;
pub mod realtime;
pub mod store;

use serde::{Deserialize, Serialize};

pub use self::app::ServerConfig;
pub use self::auth::AuthConfig;
pub use self::logging::LoggingConfig;
pub use self::realtime::{ReconnectConfig, RealtimeConfig, TransportKind};
pub use self::store::StoreConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// files (default.toml + environment overlay) and `LOVEBIRDS__*` variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Credential verification settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Real-time channel settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Message store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default` with the environment-specific overlay
    /// `config/{env}` and environment variables prefixed with `LOVEBIRDS__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("LOVEBIRDS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would make channel tasks misbehave at runtime.
    pub fn validate(&self) -> Result<(), AppError> {
        let rt = &self.realtime;
        let positive = [
            ("realtime.channel_buffer_size", rt.channel_buffer_size as u64),
            ("realtime.typing_timeout_ms", rt.typing_timeout_ms),
            ("realtime.typing_sweep_interval_ms", rt.typing_sweep_interval_ms),
            ("realtime.ping_interval_seconds", rt.ping_interval_seconds),
            ("realtime.ping_timeout_seconds", rt.ping_timeout_seconds),
            ("realtime.poll_wait_seconds", rt.poll_wait_seconds),
            ("realtime.max_message_size", rt.max_message_size as u64),
            ("realtime.reconnect.base_delay_ms", rt.reconnect.base_delay_ms),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(AppError::configuration(format!("{name} must be greater than zero")));
        }

        if rt.transports.is_empty() {
            return Err(AppError::configuration(
                "realtime.transports must enable at least one transport",
            ));
        }
        if rt.reconnect.max_delay_ms < rt.reconnect.base_delay_ms {
            return Err(AppError::configuration(
                "realtime.reconnect.max_delay_ms must not be below base_delay_ms",
            ));
        }

        Ok(())
    }
}
