//! Credential verification configuration.

use serde::{Deserialize, Serialize};

/// JWT settings shared by the verifier and the development token issuer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign and verify credentials.
    #[serde(default = "default_secret")]
    pub jwt_secret: String,
    /// Allowed clock skew when checking expiry, in seconds.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
    /// Lifetime of issued tokens, in minutes.
    #[serde(default = "default_ttl")]
    pub token_ttl_minutes: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_secret(),
            leeway_seconds: default_leeway(),
            token_ttl_minutes: default_ttl(),
        }
    }
}

fn default_secret() -> String {
    "change-me-in-production".to_string()
}

fn default_leeway() -> u64 {
    5
}

fn default_ttl() -> u64 {
    60 * 24 * 7
}
