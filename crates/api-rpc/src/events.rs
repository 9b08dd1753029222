//! Event fan-out to RPC subscribers

use discscan_core::domain::ScanNotification;
use discscan_core::port::EventSink;
use tokio::sync::broadcast;
use tracing::debug;

/// Capacity of the subscriber channel
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Broadcasts every scan notification to all current subscribers
///
/// Events emitted while nobody is subscribed are not queued; the latest one
/// stays available through `scan.status.v1`.
pub struct BroadcastEventSink {
    tx: broadcast::Sender<ScanNotification>,
}

impl BroadcastEventSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanNotification> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for BroadcastEventSink {
    fn emit(&self, notification: &ScanNotification) {
        let receivers = self.tx.send(notification.clone()).unwrap_or(0);
        debug!(
            session_id = %notification.session_id,
            event = notification.event.name(),
            receivers,
            "Scan event broadcast"
        );
    }
}
