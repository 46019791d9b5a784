//! Reconnection controller.
//!
//! Keeps one channel alive for the application. An unexpected drop is
//! retried with bounded exponential backoff; each successful
//! (re)connection is a brand-new server Session, so the recent-chats
//! snapshot is requested again every time. A credential rejection is
//! terminal and surfaces as [`ConnectionState::LoggedOut`].

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use lovebirds_core::error::AppError;
use lovebirds_core::result::AppResult;
use lovebirds_core::types::ConversationId;
use lovebirds_realtime::connection::validator::{self, TokenShape};
use lovebirds_realtime::message::types::{InboundMessage, OutboundMessage};

use crate::policy::ReconnectPolicy;
use crate::state::ConnectionState;
use crate::transport::{ChatTransport, Connector, rejection};

/// Application-facing handle to a self-healing channel.
#[derive(Debug)]
pub struct ChatClient {
    commands: mpsc::Sender<InboundMessage>,
    events: mpsc::Receiver<OutboundMessage>,
    state: watch::Receiver<ConnectionState>,
    cancel: CancellationToken,
    task: JoinHandle<ConnectionState>,
}

impl ChatClient {
    /// Starts connecting with `token`.
    ///
    /// A structurally invalid token is refused locally, before any network
    /// traffic; the caller must discard it (log out).
    pub fn start(
        connector: Arc<dyn Connector>,
        policy: ReconnectPolicy,
        token: impl Into<String>,
    ) -> AppResult<Self> {
        let token = token.into();
        if let TokenShape::Invalid(reason) = validator::validate(&token) {
            return Err(AppError::malformed_credential(format!(
                "Authentication failed: {reason}"
            )));
        }

        let (command_tx, command_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::channel(256);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let cancel = CancellationToken::new();

        let controller = Controller {
            connector,
            policy,
            token,
            commands: command_rx,
            events: event_tx,
            state: state_tx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(controller.run());

        Ok(Self {
            commands: command_tx,
            events: event_rx,
            state: state_rx,
            cancel,
            task,
        })
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Waits until the state satisfies `predicate`.
    pub async fn wait_for_state(
        &self,
        predicate: impl FnMut(&ConnectionState) -> bool,
    ) -> AppResult<ConnectionState> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(predicate)
            .await
            .map_err(|_| AppError::transport("Client task ended"))?;
        Ok(state.clone())
    }

    /// Queues an event; delivered once a channel is up.
    pub async fn send(&self, msg: InboundMessage) -> AppResult<()> {
        self.commands
            .send(msg)
            .await
            .map_err(|_| AppError::transport("Client is closed"))
    }

    /// Requests a fresh recent-chats snapshot.
    pub async fn load_recent_chats(&self) -> AppResult<()> {
        self.send(InboundMessage::LoadRecentChats).await
    }

    /// Signals typing in a conversation.
    pub async fn signal_typing(&self, conversation_id: ConversationId, active: bool) -> AppResult<()> {
        self.send(InboundMessage::SignalTyping {
            conversation_id,
            active,
        })
        .await
    }

    /// Next server event. Connection bookkeeping events are not surfaced.
    pub async fn next_event(&mut self) -> Option<OutboundMessage> {
        self.events.recv().await
    }

    /// Closes the channel and stops reconnecting.
    pub async fn close(self) -> ConnectionState {
        self.cancel.cancel();
        self.task.await.unwrap_or(ConnectionState::Closed)
    }
}

/// How a live channel ended.
#[derive(Debug)]
enum ChannelEnd {
    /// Closed by the application.
    Closed,
    /// Lost; worth reconnecting.
    Dropped,
    /// The server refused to keep it.
    Rejected(AppError),
}

struct Controller {
    connector: Arc<dyn Connector>,
    policy: ReconnectPolicy,
    token: String,
    commands: mpsc::Receiver<InboundMessage>,
    events: mpsc::Sender<OutboundMessage>,
    state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
}

impl Controller {
    async fn run(mut self) -> ConnectionState {
        let mut attempt = 0u32;

        loop {
            let connected = tokio::select! {
                _ = self.cancel.cancelled() => return self.finish(ConnectionState::Closed),
                result = self.connector.connect(&self.token) => result,
            };

            match connected {
                Ok(mut transport) => {
                    attempt = 0;
                    let channel_id = transport.channel_id();
                    info!(conn_id = %channel_id, transport = transport.kind().as_str(), "Channel connected");
                    self.state.send_replace(ConnectionState::Connected {
                        channel_id,
                        transport: transport.kind(),
                    });

                    match self.drive(transport.as_mut()).await {
                        ChannelEnd::Closed => {
                            transport.close().await;
                            return self.finish(ConnectionState::Closed);
                        }
                        ChannelEnd::Rejected(err) => {
                            return self.finish(terminal_state(err));
                        }
                        ChannelEnd::Dropped => {
                            warn!(conn_id = %channel_id, "Channel dropped");
                        }
                    }
                }
                Err(e) if e.kind.is_credential_failure() => {
                    return self.finish(ConnectionState::LoggedOut { reason: e.message });
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Connection attempt failed");
                }
            }

            attempt += 1;
            let Some(delay) = self.policy.delay_for(attempt) else {
                return self.finish(ConnectionState::Failed {
                    attempts: attempt - 1,
                });
            };

            info!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");
            self.state
                .send_replace(ConnectionState::Reconnecting { attempt, delay });

            tokio::select! {
                _ = self.cancel.cancelled() => return self.finish(ConnectionState::Closed),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Pumps events both ways until the channel ends.
    async fn drive(&mut self, transport: &mut dyn ChatTransport) -> ChannelEnd {
        if let Err(e) = transport.send(&InboundMessage::LoadRecentChats).await {
            warn!(error = %e, "Failed to request recent chats");
            return ChannelEnd::Dropped;
        }

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return ChannelEnd::Closed,
                event = transport.recv() => match event {
                    None => return ChannelEnd::Dropped,
                    Some(OutboundMessage::ConnectError { code, reason }) => {
                        return ChannelEnd::Rejected(rejection(&code, &reason));
                    }
                    Some(OutboundMessage::Ping { timestamp }) => {
                        if transport.send(&InboundMessage::Pong { timestamp }).await.is_err() {
                            return ChannelEnd::Dropped;
                        }
                    }
                    Some(OutboundMessage::Connected { .. }) => {}
                    Some(event) => {
                        if self.events.send(event).await.is_err() {
                            return ChannelEnd::Closed;
                        }
                    }
                },
                command = self.commands.recv() => match command {
                    Some(msg) => {
                        if let Err(e) = transport.send(&msg).await {
                            warn!(event = msg.name(), error = %e, "Send failed");
                            return ChannelEnd::Dropped;
                        }
                    }
                    None => return ChannelEnd::Closed,
                },
            }
        }
    }

    fn finish(&self, state: ConnectionState) -> ConnectionState {
        info!(?state, "Client stopped");
        self.state.send_replace(state.clone());
        state
    }
}

fn terminal_state(err: AppError) -> ConnectionState {
    if err.kind.is_credential_failure() {
        ConnectionState::LoggedOut {
            reason: err.message,
        }
    } else {
        ConnectionState::Rejected {
            code: err.kind.code().to_string(),
            reason: err.message,
        }
    }
}
