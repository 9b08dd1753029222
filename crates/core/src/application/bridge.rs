// Event Bridge - delivers a session outcome across the UI boundary

use crate::domain::{ScanEvent, ScanNotification, ScanOutcome};
use crate::port::{ArtifactRevealer, EventSink};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct EventBridge {
    sink: Arc<dyn EventSink>,
    revealer: Arc<dyn ArtifactRevealer>,
    artifact_path: PathBuf,
}

impl EventBridge {
    pub fn new(
        sink: Arc<dyn EventSink>,
        revealer: Arc<dyn ArtifactRevealer>,
        artifact_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sink,
            revealer,
            artifact_path: artifact_path.into(),
        }
    }

    /// Emit the event for an outcome; on success also reveal the scan artifact
    pub async fn deliver(&self, session_id: &str, outcome: &ScanOutcome) -> ScanNotification {
        let notification = ScanNotification {
            session_id: session_id.to_string(),
            event: ScanEvent::from(outcome),
        };

        match &notification.event {
            ScanEvent::ScanError { message } => {
                error!(session_id = %session_id, message = %message, "Scan error");
            }
            ScanEvent::ScanComplete { failed_discs, .. } => {
                info!(
                    session_id = %session_id,
                    failed_discs = failed_discs.len(),
                    "Scan complete"
                );
            }
        }

        self.sink.emit(&notification);

        if outcome.is_success() {
            if let Err(e) = self.revealer.reveal(&self.artifact_path).await {
                warn!(error = %e, "Failed to reveal scan artifact");
            }
        }

        notification
    }
}
