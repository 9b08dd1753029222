// Change Source Port
// File-system change notifications for the scanner log

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tokio::sync::mpsc;

/// Kind of change reported by a watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Contents or metadata changed
    Modified,
    /// File was moved away or deleted
    Replaced,
    /// Notifications were dropped; a full re-read is required
    Overflow,
}

/// Watch errors
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Cannot watch {path}: {reason}")]
    Unavailable { path: String, reason: String },

    #[error("Watcher backend unsupported on this platform: {0}")]
    Unsupported(String),
}

/// Active watch on the log file, owned by the scan session
///
/// Dropping the watch (or calling [`LogWatch::release`]) detaches it from the
/// file system.
pub struct LogWatch {
    notices: mpsc::Receiver<ChangeKind>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl LogWatch {
    pub fn new(
        notices: mpsc::Receiver<ChangeKind>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            notices,
            release: Some(Box::new(release)),
        }
    }

    /// Next change notice; None once the watcher has stopped
    pub async fn next(&mut self) -> Option<ChangeKind> {
        self.notices.recv().await
    }

    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            self.notices.close();
            release();
        }
    }
}

impl Drop for LogWatch {
    fn drop(&mut self) {
        self.release();
    }
}

#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Attach a watch to an existing file
    ///
    /// # Errors
    /// - WatchError::Unavailable if the file cannot be watched
    async fn watch(&self, path: &Path) -> Result<LogWatch, WatchError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Manually driven change source
    pub struct MockChangeSource {
        sender: Mutex<Option<mpsc::Sender<ChangeKind>>>,
        released: Arc<AtomicBool>,
        watches: AtomicUsize,
        fail: bool,
    }

    impl MockChangeSource {
        pub fn new() -> Self {
            Self {
                sender: Mutex::new(None),
                released: Arc::new(AtomicBool::new(false)),
                watches: AtomicUsize::new(0),
                fail: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        /// Deliver a change notice to the current watch
        pub async fn notify(&self) -> bool {
            let sender = self.sender.lock().unwrap().clone();
            match sender {
                Some(tx) => tx.send(ChangeKind::Modified).await.is_ok(),
                None => false,
            }
        }

        pub fn watch_count(&self) -> usize {
            self.watches.load(Ordering::SeqCst)
        }

        pub fn is_released(&self) -> bool {
            self.released.load(Ordering::SeqCst)
        }
    }

    impl Default for MockChangeSource {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ChangeSource for MockChangeSource {
        async fn watch(&self, path: &Path) -> Result<LogWatch, WatchError> {
            if self.fail {
                return Err(WatchError::Unavailable {
                    path: path.display().to_string(),
                    reason: "mock watch failure".to_string(),
                });
            }
            self.watches.fetch_add(1, Ordering::SeqCst);

            let (tx, rx) = mpsc::channel(16);
            *self.sender.lock().unwrap() = Some(tx);
            self.released.store(false, Ordering::SeqCst);

            let released = Arc::clone(&self.released);
            Ok(LogWatch::new(rx, move || {
                released.store(true, Ordering::SeqCst);
            }))
        }
    }
}
