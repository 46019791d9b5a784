//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use lovebirds_core::config::RealtimeConfig;
use lovebirds_core::traits::{CredentialVerifier, MessageLog, UserDirectory};

use crate::connection::gateway::ConnectionGateway;
use crate::connection::manager::ConnectionManager;
use crate::metrics::{MetricsSnapshot, RealtimeMetrics};
use crate::presence::broadcaster::TypingBroadcaster;
use crate::session::registry::SessionRegistry;
use crate::sync::recent_chats::RecentChatsSynchronizer;
use crate::sync::sidebar::SidebarNotifier;
use crate::transport::polling::PollingChannels;

/// Central real-time engine that coordinates all channel subsystems.
#[derive(Debug, Clone)]
pub struct RealtimeEngine {
    /// Handshake entry point.
    pub gateway: ConnectionGateway,
    /// Channel lifecycle and event dispatch.
    pub connections: Arc<ConnectionManager>,
    /// User → channels mapping.
    pub registry: Arc<SessionRegistry>,
    /// Typing relay.
    pub typing: Arc<TypingBroadcaster>,
    /// Recent-chats snapshots.
    pub sync: Arc<RecentChatsSynchronizer>,
    /// Parked polling channels.
    pub polling: Arc<PollingChannels>,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
    /// Engine configuration.
    pub config: RealtimeConfig,
    /// Cancelled on shutdown; stops background tasks.
    shutdown: CancellationToken,
}

impl RealtimeEngine {
    /// Creates a new real-time engine with all subsystems.
    pub fn new(
        config: RealtimeConfig,
        verifier: Arc<dyn CredentialVerifier>,
        log: Arc<dyn MessageLog>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let metrics = Arc::new(RealtimeMetrics::new());
        let registry = Arc::new(SessionRegistry::new(config.max_channels_per_user));
        let typing = Arc::new(TypingBroadcaster::new(
            config.typing_timeout(),
            registry.clone(),
            log.clone(),
            directory.clone(),
            metrics.clone(),
        ));
        let sync = Arc::new(RecentChatsSynchronizer::new(log.clone(), metrics.clone()));
        let sidebar = Arc::new(SidebarNotifier::new(
            registry.clone(),
            directory.clone(),
            metrics.clone(),
            config.preview_length,
        ));
        let connections = Arc::new(ConnectionManager::new(
            config.clone(),
            registry.clone(),
            typing.clone(),
            sync.clone(),
            sidebar,
            log,
            directory,
            metrics.clone(),
        ));
        let gateway = ConnectionGateway::new(
            verifier,
            connections.clone(),
            metrics.clone(),
            config.transports.clone(),
            shutdown.clone(),
        );

        info!(
            path = %config.handshake_path,
            transports = ?config.transports,
            "Real-time engine initialized"
        );

        Self {
            gateway,
            connections,
            registry,
            typing,
            sync,
            polling: Arc::new(PollingChannels::new()),
            metrics,
            config,
            shutdown,
        }
    }

    /// Starts background tasks (typing expiry sweeper).
    pub fn start(&self) {
        let typing = self.typing.clone();
        let every = Duration::from_millis(self.config.typing_sweep_interval_ms);
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            typing.run_expiry_sweeper(every, shutdown).await;
        });
    }

    /// Token cancelled when the engine shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stops admitting channels, then closes every live one.
    pub async fn shutdown(&self) {
        info!("Shutting down real-time engine");

        self.shutdown.cancel();
        self.connections.close_all().await;

        info!("Real-time engine shut down");
    }

    /// Current metrics.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
