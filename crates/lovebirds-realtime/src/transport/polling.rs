//! Long-polling channel store.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc};
use tracing::debug;

use lovebirds_core::types::ChannelId;

use crate::connection::handle::ConnectionHandle;
use crate::message::types::OutboundMessage;

/// A polling channel: the handle plus its parked outbound queue.
#[derive(Debug)]
pub struct PollingChannel {
    handle: Arc<ConnectionHandle>,
    receiver: Mutex<mpsc::Receiver<OutboundMessage>>,
}

impl PollingChannel {
    /// Wraps an admitted channel.
    pub fn new(handle: Arc<ConnectionHandle>, receiver: mpsc::Receiver<OutboundMessage>) -> Self {
        Self {
            handle,
            receiver: Mutex::new(receiver),
        }
    }

    /// The channel handle.
    pub fn handle(&self) -> &Arc<ConnectionHandle> {
        &self.handle
    }

    /// Waits up to `wait` for at least one event, then returns everything
    /// queued, in order.
    ///
    /// Returns early with whatever is queued if the channel closes. Counts
    /// as client activity. Concurrent polls on one channel are serialized.
    pub async fn drain(&self, wait: Duration) -> Vec<OutboundMessage> {
        self.handle.touch().await;
        let mut receiver = self.receiver.lock().await;
        let mut events = Vec::new();

        if let Ok(first) = receiver.try_recv() {
            events.push(first);
        } else if self.handle.is_alive() {
            tokio::select! {
                first = receiver.recv() => events.extend(first),
                _ = self.handle.closed() => {}
                _ = tokio::time::sleep(wait) => {}
            }
        }

        while let Ok(next) = receiver.try_recv() {
            events.push(next);
        }

        self.handle.touch().await;
        events
    }
}

/// All live polling channels, keyed by channel ID.
#[derive(Debug, Default)]
pub struct PollingChannels {
    channels: DashMap<ChannelId, Arc<PollingChannel>>,
}

impl PollingChannels {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks a channel's queue until it is polled.
    ///
    /// Once the channel closes, the entry lingers for `linger` so a final
    /// poll can still collect the closing events, then is dropped.
    pub fn insert(
        self: &Arc<Self>,
        handle: Arc<ConnectionHandle>,
        receiver: mpsc::Receiver<OutboundMessage>,
        linger: Duration,
    ) -> Arc<PollingChannel> {
        let channel = Arc::new(PollingChannel::new(handle.clone(), receiver));
        self.channels.insert(handle.id, channel.clone());

        let this = Arc::clone(self);
        tokio::spawn(async move {
            handle.closed().await;
            tokio::time::sleep(linger).await;
            if this.channels.remove(&handle.id).is_some() {
                debug!(conn_id = %handle.id, "Dropped closed polling channel");
            }
        });

        channel
    }

    /// Looks up a channel.
    pub fn get(&self, channel_id: &ChannelId) -> Option<Arc<PollingChannel>> {
        self.channels.get(channel_id).map(|c| c.value().clone())
    }

    /// Forgets a channel.
    pub fn remove(&self, channel_id: &ChannelId) -> Option<Arc<PollingChannel>> {
        self.channels.remove(channel_id).map(|(_, c)| c)
    }

    /// Number of parked channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether no channel is parked.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
