// Event Sink Port
// Outbound side of the UI boundary

use crate::domain::ScanNotification;

/// Receives scan events destined for the UI
///
/// Implementations:
/// - BroadcastEventSink (api-rpc): fans out to RPC subscribers
/// - RecordingEventSink: collects events in tests
pub trait EventSink: Send + Sync {
    fn emit(&self, notification: &ScanNotification);
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Collects every emitted notification
    #[derive(Default)]
    pub struct RecordingEventSink {
        events: Mutex<Vec<ScanNotification>>,
        notify: Notify,
    }

    impl RecordingEventSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<ScanNotification> {
            self.events.lock().unwrap().clone()
        }

        pub fn count(&self) -> usize {
            self.events.lock().unwrap().len()
        }

        /// Wait until at least `count` events were emitted, or the timeout elapses
        pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                let notified = self.notify.notified();
                if self.count() >= count {
                    return true;
                }
                if tokio::time::timeout_at(deadline, notified).await.is_err() {
                    return self.count() >= count;
                }
            }
        }
    }

    impl EventSink for RecordingEventSink {
        fn emit(&self, notification: &ScanNotification) {
            self.events.lock().unwrap().push(notification.clone());
            self.notify.notify_waiters();
        }
    }
}
