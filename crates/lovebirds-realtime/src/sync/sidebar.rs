//! Incremental sidebar fan-out for newly stored messages.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use lovebirds_core::events::SidebarEvent;
use lovebirds_core::traits::UserDirectory;
use lovebirds_core::types::{ChannelId, StoredMessage, UserId};

use crate::message::types::OutboundMessage;
use crate::metrics::RealtimeMetrics;
use crate::session::registry::SessionRegistry;

/// Pushes one `newMessageForSidebar` per stored message to every live
/// channel of every recipient, plus the sender's other devices.
#[derive(Debug)]
pub struct SidebarNotifier {
    registry: Arc<SessionRegistry>,
    directory: Arc<dyn UserDirectory>,
    metrics: Arc<RealtimeMetrics>,
    preview_length: usize,
}

impl SidebarNotifier {
    /// Creates a notifier.
    pub fn new(
        registry: Arc<SessionRegistry>,
        directory: Arc<dyn UserDirectory>,
        metrics: Arc<RealtimeMetrics>,
        preview_length: usize,
    ) -> Self {
        Self {
            registry,
            directory,
            metrics,
            preview_length,
        }
    }

    /// Fans out the sidebar event for `message`.
    ///
    /// `origin` is the sender's channel that submitted the message, if any;
    /// it is acknowledged separately and skipped here. Returns the number of
    /// channels the event was queued on.
    pub async fn message_stored(&self, message: &StoredMessage, origin: Option<ChannelId>) -> usize {
        let event = OutboundMessage::NewMessageForSidebar(SidebarEvent::from_stored(
            message,
            self.preview_length,
        ));

        let mut seen: HashSet<UserId> = HashSet::new();
        let mut delivered = 0usize;

        for recipient in &message.recipient_ids {
            if *recipient == message.sender_id || !seen.insert(*recipient) {
                continue;
            }

            match self
                .directory
                .is_blocked_between(message.sender_id, *recipient)
                .await
            {
                Ok(false) => {}
                Ok(true) => continue,
                Err(e) => {
                    warn!(user_id = %recipient, error = %e, "Block lookup failed, skipping sidebar event");
                    continue;
                }
            }

            for handle in self.registry.handles_for(recipient) {
                if handle.send(event.clone()) {
                    delivered += 1;
                }
            }
        }

        for handle in self.registry.handles_for(&message.sender_id) {
            if Some(handle.id) == origin {
                continue;
            }
            if handle.send(event.clone()) {
                delivered += 1;
            }
        }

        debug!(
            message_id = %message.id,
            conversation_id = %message.conversation_id,
            delivered,
            "Sidebar event fanned out"
        );
        self.metrics.sidebar_delivered(delivered as u64);
        self.metrics.events_sent(delivered as u64);
        delivered
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use lovebirds_core::config::TransportKind;
    use lovebirds_core::traits::MessageLog;
    use lovebirds_core::types::NewMessage;
    use lovebirds_store::MemoryMessageLog;

    use crate::connection::handle::ConnectionHandle;

    use super::*;

    fn connect(
        registry: &SessionRegistry,
        user_id: UserId,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(16);
        let handle = Arc::new(ConnectionHandle::new(
            user_id,
            "user".to_string(),
            TransportKind::Websocket,
            None,
            tx,
        ));
        registry.register(handle.clone());
        (handle, rx)
    }

    fn sidebar_events(rx: &mut mpsc::Receiver<OutboundMessage>) -> Vec<SidebarEvent> {
        let mut events = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let OutboundMessage::NewMessageForSidebar(event) = msg {
                events.push(event);
            }
        }
        events
    }

    async fn setup() -> (Arc<MemoryMessageLog>, Arc<SessionRegistry>, SidebarNotifier, UserId, UserId) {
        let store = Arc::new(MemoryMessageLog::new());
        let registry = Arc::new(SessionRegistry::new(0));
        let notifier = SidebarNotifier::new(
            registry.clone(),
            store.clone(),
            Arc::new(RealtimeMetrics::new()),
            80,
        );
        let ana = UserId::new();
        let ben = UserId::new();
        store.add_user(ana, "Ana").await;
        store.add_user(ben, "Ben").await;
        (store, registry, notifier, ana, ben)
    }

    #[tokio::test]
    async fn test_recipient_receives_exactly_one_event() {
        let (store, registry, notifier, ana, ben) = setup().await;
        let conversation = store.create_conversation(vec![ana, ben]).await;
        let (_ana_conn, mut ana_rx) = connect(&registry, ana);
        let (ben_conn, mut ben_rx) = connect(&registry, ben);

        let stored = store
            .store(NewMessage {
                conversation_id: conversation,
                sender_id: ben,
                sender_name: "Ben".to_string(),
                body: "hey".to_string(),
            })
            .await
            .unwrap();
        notifier.message_stored(&stored, Some(ben_conn.id)).await;

        let events = sidebar_events(&mut ana_rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message_id, stored.id);
        assert_eq!(events[0].sender_id, ben);
        assert!(sidebar_events(&mut ben_rx).is_empty());
    }

    #[tokio::test]
    async fn test_senders_other_devices_are_updated() {
        let (store, registry, notifier, ana, ben) = setup().await;
        let conversation = store.create_conversation(vec![ana, ben]).await;
        let (phone, mut phone_rx) = connect(&registry, ana);
        let (_laptop, mut laptop_rx) = connect(&registry, ana);

        let stored = store
            .store(NewMessage {
                conversation_id: conversation,
                sender_id: ana,
                sender_name: "Ana".to_string(),
                body: "on my way".to_string(),
            })
            .await
            .unwrap();
        let delivered = notifier.message_stored(&stored, Some(phone.id)).await;

        assert_eq!(delivered, 1);
        assert!(sidebar_events(&mut phone_rx).is_empty());
        assert_eq!(sidebar_events(&mut laptop_rx).len(), 1);
    }

    #[tokio::test]
    async fn test_blocked_recipient_is_skipped() {
        let (store, registry, notifier, ana, ben) = setup().await;
        let conversation = store.create_conversation(vec![ana, ben]).await;
        let (_ana_conn, mut ana_rx) = connect(&registry, ana);
        store.block(ana, ben).await;

        let stored = store
            .insert_message_at(conversation, ben, "hello?", chrono::Utc::now())
            .await
            .unwrap();
        notifier.message_stored(&stored, None).await;

        assert!(sidebar_events(&mut ana_rx).is_empty());
    }
}
