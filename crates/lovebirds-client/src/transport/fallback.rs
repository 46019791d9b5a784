//! Streaming-first connector with transparent polling fallback.

use async_trait::async_trait;
use tracing::warn;

use lovebirds_core::result::AppResult;

use super::{ChatTransport, Connector};

/// Tries `primary`; on a transport failure retries once with `fallback`.
///
/// Credential rejections are returned as-is, never retried.
#[derive(Debug)]
pub struct FallbackConnector {
    primary: Box<dyn Connector>,
    fallback: Box<dyn Connector>,
}

impl FallbackConnector {
    /// Creates the connector.
    pub fn new(primary: Box<dyn Connector>, fallback: Box<dyn Connector>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl Connector for FallbackConnector {
    async fn connect(&self, token: &str) -> AppResult<Box<dyn ChatTransport>> {
        match self.primary.connect(token).await {
            Ok(transport) => Ok(transport),
            Err(e) if e.kind.is_credential_failure() => Err(e),
            Err(e) => {
                warn!(error = %e, "Streaming transport unavailable, falling back to polling");
                self.fallback.connect(token).await
            }
        }
    }
}
