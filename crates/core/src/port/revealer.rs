// Artifact Revealer Port
// Shows the scan output in the host file browser

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("Cannot reveal {path}: {reason}")]
pub struct RevealError {
    pub path: String,
    pub reason: String,
}

#[async_trait]
pub trait ArtifactRevealer: Send + Sync {
    async fn reveal(&self, path: &Path) -> Result<(), RevealError>;
}

/// Revealer for headless runs
pub struct NoopRevealer;

#[async_trait]
impl ArtifactRevealer for NoopRevealer {
    async fn reveal(&self, path: &Path) -> Result<(), RevealError> {
        tracing::debug!(path = %path.display(), "Artifact reveal disabled");
        Ok(())
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockRevealer {
        revealed: Mutex<Vec<PathBuf>>,
        fail: bool,
    }

    impl MockRevealer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                revealed: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn revealed(&self) -> Vec<PathBuf> {
            self.revealed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ArtifactRevealer for MockRevealer {
        async fn reveal(&self, path: &Path) -> Result<(), RevealError> {
            self.revealed.lock().unwrap().push(path.to_path_buf());
            if self.fail {
                return Err(RevealError {
                    path: path.display().to_string(),
                    reason: "no file browser".to_string(),
                });
            }
            Ok(())
        }
    }
}
