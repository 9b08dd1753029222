// Log Source Port
// Read access to the scanner's append-only log file

use async_trait::async_trait;
use std::path::PathBuf;

/// Cheap identity of the log file contents, used to tell a fresh log from a
/// stale one left behind by a previous run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFingerprint {
    pub len: u64,
    pub modified_ms: Option<i64>,
}

#[async_trait]
pub trait LogSource: Send + Sync {
    /// Path of the observed log file
    fn path(&self) -> PathBuf;

    /// Fingerprint of the file, None when it does not exist
    async fn fingerprint(&self) -> Option<LogFingerprint>;

    /// Read the whole file
    async fn read_all(&self) -> std::io::Result<String>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory log file
    ///
    /// Every write bumps a version that is reported as the modification time,
    /// so fingerprints change even when the length does not.
    pub struct MockLogSource {
        content: Mutex<Option<String>>,
        version: AtomicUsize,
        failing_reads: AtomicUsize,
        reads: AtomicUsize,
    }

    impl MockLogSource {
        /// Log file that does not exist yet
        pub fn absent() -> Self {
            Self {
                content: Mutex::new(None),
                version: AtomicUsize::new(0),
                failing_reads: AtomicUsize::new(0),
                reads: AtomicUsize::new(0),
            }
        }

        pub fn with_lines(lines: &[&str]) -> Self {
            let source = Self::absent();
            source.set_lines(lines);
            source
        }

        pub fn set_lines(&self, lines: &[&str]) {
            let mut text = lines.join("\n");
            text.push('\n');
            *self.content.lock().unwrap() = Some(text);
            self.version.fetch_add(1, Ordering::SeqCst);
        }

        pub fn append_line(&self, line: &str) {
            let mut content = self.content.lock().unwrap();
            let text = content.get_or_insert_with(String::new);
            text.push_str(line);
            text.push('\n');
            self.version.fetch_add(1, Ordering::SeqCst);
        }

        /// Make the next `count` reads fail with a permission error
        pub fn fail_next_reads(&self, count: usize) {
            self.failing_reads.store(count, Ordering::SeqCst);
        }

        pub fn read_count(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LogSource for MockLogSource {
        fn path(&self) -> PathBuf {
            PathBuf::from("mock/scan_output/log.txt")
        }

        async fn fingerprint(&self) -> Option<LogFingerprint> {
            let content = self.content.lock().unwrap();
            content.as_ref().map(|text| LogFingerprint {
                len: text.len() as u64,
                modified_ms: Some(self.version.load(Ordering::SeqCst) as i64),
            })
        }

        async fn read_all(&self) -> std::io::Result<String> {
            self.reads.fetch_add(1, Ordering::SeqCst);

            let failing = self.failing_reads.load(Ordering::SeqCst);
            if failing > 0 {
                self.failing_reads.store(failing - 1, Ordering::SeqCst);
                return Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "log locked by scanner",
                ));
            }

            self.content.lock().unwrap().clone().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "log file missing")
            })
        }
    }
}
