// Portable change source: compares the log fingerprint on an interval

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::log_file::fingerprint_of;
use discscan_core::application::constants::{CHANGE_CHANNEL_CAPACITY, DEFAULT_POLL_INTERVAL};
use discscan_core::port::{ChangeKind, ChangeSource, LogWatch, WatchError};

pub struct PollingChangeSource {
    interval: Duration,
}

impl PollingChangeSource {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for PollingChangeSource {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

#[async_trait]
impl ChangeSource for PollingChangeSource {
    async fn watch(&self, path: &Path) -> Result<LogWatch, WatchError> {
        let mut last = fingerprint_of(path).await;
        if last.is_none() {
            return Err(WatchError::Unavailable {
                path: path.display().to_string(),
                reason: "file does not exist".to_string(),
            });
        }

        let (tx, rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
        let path = path.to_path_buf();
        let period = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = tx.closed() => break,
                }

                let current = fingerprint_of(&path).await;
                if current == last {
                    continue;
                }
                let kind = if current.is_none() {
                    ChangeKind::Replaced
                } else {
                    ChangeKind::Modified
                };
                last = current;

                if tx.send(kind).await.is_err() {
                    break;
                }
            }
            debug!(path = %path.display(), "Polling watch stopped");
        });

        Ok(LogWatch::new(rx, move || task.abort()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let source = PollingChangeSource::new(Duration::from_millis(10));

        let result = source.watch(&dir.path().join("log.txt")).await;
        assert!(matches!(result, Err(WatchError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn test_append_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.txt");
        std::fs::write(&path, "INFO a\n").unwrap();

        let source = PollingChangeSource::new(Duration::from_millis(10));
        let mut watch = source.watch(&path).await.unwrap();

        std::fs::write(&path, "INFO a\nINFO b\n").unwrap();
        let notice = timeout(Duration::from_secs(2), watch.next()).await.unwrap();
        assert_eq!(notice, Some(ChangeKind::Modified));

        std::fs::remove_file(&path).unwrap();
        let notice = timeout(Duration::from_secs(2), watch.next()).await.unwrap();
        assert_eq!(notice, Some(ChangeKind::Replaced));

        watch.release();
        assert!(watch.is_released());
    }
}
