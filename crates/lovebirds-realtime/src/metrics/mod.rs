//! Realtime engine metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Engine-level metrics counters.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    /// Channels admitted since start.
    connections_total: AtomicU64,
    /// Channels currently open.
    connections_active: AtomicU64,
    /// Handshakes rejected (malformed or unauthenticated).
    handshakes_rejected: AtomicU64,
    /// Inbound events processed.
    events_received: AtomicU64,
    /// Outbound events queued for delivery.
    events_sent: AtomicU64,
    /// Sidebar events fanned out.
    sidebar_events: AtomicU64,
}

impl RealtimeMetrics {
    /// Create new zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an admitted channel.
    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a closed channel.
    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a rejected handshake.
    pub fn handshake_rejected(&self) {
        self.handshakes_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an inbound event.
    pub fn event_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record `count` outbound events.
    pub fn events_sent(&self, count: u64) {
        self.events_sent.fetch_add(count, Ordering::Relaxed);
    }

    /// Record `count` sidebar deliveries.
    pub fn sidebar_delivered(&self, count: u64) {
        self.sidebar_events.fetch_add(count, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            handshakes_rejected: self.handshakes_rejected.load(Ordering::Relaxed),
            events_received: self.events_received.load(Ordering::Relaxed),
            events_sent: self.events_sent.load(Ordering::Relaxed),
            sidebar_events: self.sidebar_events.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Channels admitted since start.
    pub connections_total: u64,
    /// Channels currently open.
    pub connections_active: u64,
    /// Handshakes rejected.
    pub handshakes_rejected: u64,
    /// Inbound events processed.
    pub events_received: u64,
    /// Outbound events queued.
    pub events_sent: u64,
    /// Sidebar events fanned out.
    pub sidebar_events: u64,
}
