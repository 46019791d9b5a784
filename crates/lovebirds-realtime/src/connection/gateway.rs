//! Connection gateway: admits or rejects channel handshakes.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lovebirds_core::config::TransportKind;
use lovebirds_core::error::AppError;
use lovebirds_core::result::AppResult;
use lovebirds_core::traits::{CredentialVerifier, VerifiedIdentity};

use crate::message::types::OutboundMessage;
use crate::metrics::RealtimeMetrics;

use super::handle::ConnectionHandle;
use super::manager::ConnectionManager;
use super::validator::{self, TokenShape};

/// Runs the handshake pipeline: structural check, then verification by
/// the Auth collaborator, then Session registration.
///
/// Both rejection classes are terminal for the credential. Once the
/// engine's shutdown token fires, every handshake is refused.
#[derive(Debug, Clone)]
pub struct ConnectionGateway {
    verifier: Arc<dyn CredentialVerifier>,
    manager: Arc<ConnectionManager>,
    metrics: Arc<RealtimeMetrics>,
    transports: Vec<TransportKind>,
    shutdown: CancellationToken,
}

impl ConnectionGateway {
    /// Creates a gateway accepting the given transports.
    pub fn new(
        verifier: Arc<dyn CredentialVerifier>,
        manager: Arc<ConnectionManager>,
        metrics: Arc<RealtimeMetrics>,
        transports: Vec<TransportKind>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            verifier,
            manager,
            metrics,
            transports,
            shutdown,
        }
    }

    /// Authenticates a credential without opening a channel.
    ///
    /// Malformed credentials are rejected without contacting the verifier.
    pub async fn handshake(&self, token: &str) -> AppResult<VerifiedIdentity> {
        if let TokenShape::Invalid(reason) = validator::validate(token) {
            self.metrics.handshake_rejected();
            debug!(reason, "Rejected malformed credential");
            return Err(AppError::malformed_credential(format!(
                "Authentication failed: {reason}"
            )));
        }

        match self.verifier.verify(token).await {
            Ok(identity) => Ok(identity),
            Err(e) => {
                self.metrics.handshake_rejected();
                warn!(error = %e, "Credential verification failed");
                Err(if e.kind.is_credential_failure() {
                    e
                } else {
                    AppError::authentication(format!("Authentication failed: {}", e.message))
                })
            }
        }
    }

    /// Authenticates a credential and opens a channel over `transport`.
    pub async fn connect(
        &self,
        token: &str,
        transport: TransportKind,
    ) -> AppResult<(Arc<ConnectionHandle>, mpsc::Receiver<OutboundMessage>)> {
        self.ensure_accepting()?;

        if !self.transports.contains(&transport) {
            self.metrics.handshake_rejected();
            return Err(AppError::transport(format!(
                "Transport {} is not enabled",
                transport.as_str()
            )));
        }

        let identity = self.handshake(token).await?;
        self.ensure_accepting()?;
        let (handle, rx) = self.manager.open(identity, transport).await;

        // Shutdown may have swept the registry while this channel was opening.
        if self.shutdown.is_cancelled() {
            self.manager.close(&handle.id, "server shutdown").await;
            return Err(Self::shutting_down());
        }

        Ok((handle, rx))
    }

    fn ensure_accepting(&self) -> AppResult<()> {
        if self.shutdown.is_cancelled() {
            info!("Refusing handshake during shutdown");
            return Err(Self::shutting_down());
        }
        Ok(())
    }

    fn shutting_down() -> AppError {
        AppError::service_unavailable("Server is shutting down")
    }

    /// Enabled transports, streaming first.
    pub fn transports(&self) -> &[TransportKind] {
        &self.transports
    }
}
