// Log file source backed by the real file system

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use discscan_core::port::{LogFingerprint, LogSource};

/// Fingerprint of a regular file, None if it is missing or not a file
pub(crate) async fn fingerprint_of(path: &Path) -> Option<LogFingerprint> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    if !meta.is_file() {
        return None;
    }
    let modified_ms = meta
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|elapsed| elapsed.as_millis() as i64);

    Some(LogFingerprint {
        len: meta.len(),
        modified_ms,
    })
}

/// Reads the scanner log written at a fixed path
pub struct LogFileSource {
    path: PathBuf,
}

impl LogFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LogSource for LogFileSource {
    fn path(&self) -> PathBuf {
        self.path.clone()
    }

    async fn fingerprint(&self) -> Option<LogFingerprint> {
        fingerprint_of(&self.path).await
    }

    /// Invalid UTF-8 (a torn multi-byte write) is replaced rather than failing the read
    async fn read_all(&self) -> std::io::Result<String> {
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
