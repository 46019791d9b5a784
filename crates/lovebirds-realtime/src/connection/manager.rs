//! Connection manager: channel lifecycle and inbound event dispatch.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use lovebirds_core::config::{RealtimeConfig, TransportKind};
use lovebirds_core::error::AppError;
use lovebirds_core::result::AppResult;
use lovebirds_core::traits::{MessageLog, UserDirectory, VerifiedIdentity};
use lovebirds_core::types::{ChannelId, ConversationId, NewMessage, StoredMessage, UserId};

use crate::message::types::{InboundMessage, OutboundMessage};
use crate::message::validator::{validate_body, validate_inbound};
use crate::metrics::RealtimeMetrics;
use crate::presence::broadcaster::TypingBroadcaster;
use crate::presence::tracker::PresenceTracker;
use crate::session::registry::SessionRegistry;
use crate::sync::recent_chats::RecentChatsSynchronizer;
use crate::sync::sidebar::SidebarNotifier;

use super::handle::ConnectionHandle;
use super::heartbeat::{self, HeartbeatConfig};

/// Owns every live channel from admission to close.
///
/// Admission registers the Session before anything is pushed, so the
/// registry already lists the channel when the first snapshot goes out.
/// Closing is idempotent; only the first close of a channel has effects.
#[derive(Debug)]
pub struct ConnectionManager {
    config: RealtimeConfig,
    registry: Arc<SessionRegistry>,
    presence: PresenceTracker,
    typing: Arc<TypingBroadcaster>,
    sync: Arc<RecentChatsSynchronizer>,
    sidebar: Arc<SidebarNotifier>,
    log: Arc<dyn MessageLog>,
    directory: Arc<dyn UserDirectory>,
    metrics: Arc<RealtimeMetrics>,
}

impl ConnectionManager {
    /// Creates a new connection manager.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: RealtimeConfig,
        registry: Arc<SessionRegistry>,
        typing: Arc<TypingBroadcaster>,
        sync: Arc<RecentChatsSynchronizer>,
        sidebar: Arc<SidebarNotifier>,
        log: Arc<dyn MessageLog>,
        directory: Arc<dyn UserDirectory>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            config,
            registry,
            presence: PresenceTracker::new(),
            typing,
            sync,
            sidebar,
            log,
            directory,
            metrics,
        }
    }

    /// Admits an authenticated channel.
    ///
    /// Queues `connected`, registers the Session, announces presence for a
    /// user's first channel, starts the heartbeat and schedules the initial
    /// recent-chats push. Returns the handle and the outbound event stream
    /// the transport must drain.
    pub async fn open(
        self: &Arc<Self>,
        identity: VerifiedIdentity,
        transport: TransportKind,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(
            identity.user_id,
            identity.display_name,
            transport,
            identity.expires_at,
            tx,
        ));

        handle.send(OutboundMessage::Connected {
            channel_id: handle.id,
            user_id: handle.user_id,
            transport,
        });

        let registration = self.registry.register(handle.clone());
        self.metrics.connection_opened();

        info!(
            conn_id = %handle.id,
            user_id = %handle.user_id,
            transport = transport.as_str(),
            "Channel opened"
        );

        if let Some(evicted) = registration.evicted {
            info!(conn_id = %evicted.id, user_id = %evicted.user_id, "Evicting oldest channel");
            evicted.send(OutboundMessage::connect_error(&AppError::session_evicted(
                "Too many open channels; this channel was replaced by a newer one",
            )));
            self.finish_close(evicted, false, "evicted").await;
        }

        if registration.first_for_user && self.presence.set_online(handle.user_id) {
            self.announce_presence(handle.user_id, true).await;
        }

        let this = Arc::clone(self);
        let hb_handle = handle.clone();
        let hb_config = HeartbeatConfig::from(&self.config);
        tokio::spawn(async move {
            heartbeat::run_heartbeat(this, hb_handle, hb_config).await;
        });

        self.sync
            .schedule_initial_push(handle.clone(), self.config.sync_debounce());

        (handle, rx)
    }

    /// Closes a channel and removes its Session.
    ///
    /// Clears typing raised on the channel and announces the user offline
    /// when it was their last channel. Returns `false` if the channel was
    /// already gone.
    pub async fn close(&self, channel_id: &ChannelId, reason: &str) -> bool {
        let Some(unregistration) = self.registry.unregister(channel_id) else {
            return false;
        };
        self.finish_close(unregistration.handle, unregistration.last_for_user, reason)
            .await;
        true
    }

    async fn finish_close(&self, handle: Arc<ConnectionHandle>, last_for_user: bool, reason: &str) {
        handle.close();
        self.metrics.connection_closed();
        self.typing.on_channel_closed(handle.id).await;

        info!(conn_id = %handle.id, user_id = %handle.user_id, reason, "Channel closed");

        if last_for_user && self.presence.set_offline(handle.user_id) {
            self.announce_presence(handle.user_id, false).await;
        }
    }

    /// Processes one raw inbound frame.
    ///
    /// Failures are reported on the same channel as an `error` event and
    /// never affect other channels.
    pub async fn handle_inbound(&self, handle: &Arc<ConnectionHandle>, raw: &str) {
        handle.touch().await;

        if let Err(e) = validate_inbound(raw, self.config.max_message_size) {
            handle.send(OutboundMessage::error(&e));
            return;
        }

        let message: InboundMessage = match serde_json::from_str(raw) {
            Ok(m) => m,
            Err(e) => {
                debug!(conn_id = %handle.id, error = %e, "Unparseable inbound frame");
                handle.send(OutboundMessage::error(&AppError::validation(format!(
                    "Invalid event: {e}"
                ))));
                return;
            }
        };

        self.handle_message(handle, message).await;
    }

    /// Dispatches one parsed inbound event.
    pub async fn handle_message(&self, handle: &Arc<ConnectionHandle>, message: InboundMessage) {
        self.metrics.event_received();
        let name = message.name();

        if let Err(e) = self.dispatch(handle, message).await {
            warn!(conn_id = %handle.id, event = name, error = %e, "Event handling failed");
            handle.send(OutboundMessage::error(&e));
        }
    }

    async fn dispatch(&self, handle: &Arc<ConnectionHandle>, message: InboundMessage) -> AppResult<()> {
        match message {
            InboundMessage::Auth { .. } => Err(AppError::validation("Channel is already authenticated")),
            InboundMessage::LoadRecentChats => {
                handle.mark_sync_requested();
                self.sync.push_snapshot(handle).await;
                Ok(())
            }
            InboundMessage::SignalTyping {
                conversation_id,
                active,
            } => self
                .typing
                .signal_typing(handle, conversation_id, active)
                .await
                .map(|_| ()),
            InboundMessage::SendMessage {
                conversation_id,
                body,
                client_ref,
            } => self.send_message(handle, conversation_id, body, client_ref).await,
            InboundMessage::MarkConversationRead { conversation_id } => {
                self.log.mark_read(conversation_id, handle.user_id).await
            }
            InboundMessage::Pong { .. } => Ok(()),
        }
    }

    async fn send_message(
        &self,
        handle: &Arc<ConnectionHandle>,
        conversation_id: ConversationId,
        body: String,
        client_ref: Option<String>,
    ) -> AppResult<()> {
        validate_body(&body, self.config.max_body_length)?;

        let stored = self
            .log
            .store(NewMessage {
                conversation_id,
                sender_id: handle.user_id,
                sender_name: handle.display_name.clone(),
                body,
            })
            .await?;

        handle.send(OutboundMessage::MessageSent {
            conversation_id,
            message_id: stored.id,
            client_ref,
            sent_at: stored.sent_at,
        });

        self.typing.clear_for_message(conversation_id, handle.user_id).await;
        self.sidebar.message_stored(&stored, Some(handle.id)).await;
        Ok(())
    }

    /// Fans out a message stored outside any channel.
    pub async fn message_stored(&self, message: &StoredMessage) -> usize {
        self.typing
            .clear_for_message(message.conversation_id, message.sender_id)
            .await;
        self.sidebar.message_stored(message, None).await
    }

    /// Closes every channel of a user after telling each one why.
    ///
    /// The credential failure is terminal on the client side. Returns the
    /// number of channels closed.
    pub async fn force_logout(&self, user_id: &UserId, reason: &str) -> usize {
        let error = AppError::authentication(reason);
        let mut closed = 0;
        for handle in self.registry.handles_for(user_id) {
            handle.send(OutboundMessage::connect_error(&error));
            if self.close(&handle.id, "forced logout").await {
                closed += 1;
            }
        }

        if closed > 0 {
            info!(user_id = %user_id, count = closed, reason, "User forcibly logged out");
        }
        closed
    }

    /// Closes a single channel whose credential has expired.
    pub async fn expire_credential(&self, handle: &ConnectionHandle) {
        handle.send(OutboundMessage::connect_error(&AppError::authentication(
            "Authentication failed: jwt expired",
        )));
        self.close(&handle.id, "credential expired").await;
    }

    /// Closes every channel.
    pub async fn close_all(&self) {
        let all = self.registry.all();
        for handle in &all {
            self.close(&handle.id, "server shutdown").await;
        }
        info!(count = all.len(), "All channels closed");
    }

    async fn announce_presence(&self, user_id: UserId, online: bool) {
        match self.directory.is_incognito(user_id).await {
            Ok(false) => {}
            Ok(true) => return,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Incognito lookup failed, not announcing presence");
                return;
            }
        }

        let partners = match self.log.partners_of(user_id).await {
            Ok(p) => p,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Cannot resolve partners for presence");
                return;
            }
        };

        let event = OutboundMessage::PresenceChanged { user_id, online };
        let mut sent = 0u64;
        for partner in partners {
            if !matches!(self.directory.is_blocked_between(user_id, partner).await, Ok(false)) {
                continue;
            }
            for handle in self.registry.handles_for(&partner) {
                if handle.send(event.clone()) {
                    sent += 1;
                }
            }
        }

        debug!(user_id = %user_id, online, recipients = sent, "Presence announced");
        self.metrics.events_sent(sent);
    }

    /// Whether the user is online.
    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.presence.is_online(*user_id)
    }

    /// Number of users online.
    pub fn online_count(&self) -> usize {
        self.presence.online_count()
    }

    /// The Session registry.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The typing broadcaster.
    pub fn typing(&self) -> &Arc<TypingBroadcaster> {
        &self.typing
    }

    /// Engine configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }
}
