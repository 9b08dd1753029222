// Process Supervisor - starts the external scanner

use crate::domain::ScanRequest;
use crate::error::{AppError, Result};
use crate::port::{ProcessHandle, ScannerLauncher};
use std::sync::Arc;
use tracing::{info, warn};

/// Launches the scanner with the request's positional arguments
///
/// Knowledge about progress comes from the log file only; the supervisor
/// hands the process handle to the session and does not read the child's output.
pub struct ProcessSupervisor {
    launcher: Arc<dyn ScannerLauncher>,
}

impl ProcessSupervisor {
    pub fn new(launcher: Arc<dyn ScannerLauncher>) -> Self {
        Self { launcher }
    }

    /// Verify the executable and spawn it
    ///
    /// # Errors
    /// - AppError::MissingExecutable before any spawn if the executable is absent
    /// - AppError::Launch if the OS refuses to start it
    pub async fn launch(&self, request: &ScanRequest) -> Result<ProcessHandle> {
        let executable = self.launcher.executable();

        if !self.launcher.executable_exists().await {
            warn!(executable = %executable.display(), "Scanner executable missing");
            return Err(AppError::MissingExecutable(executable));
        }

        let args = request.launch_args();
        info!(
            executable = %executable.display(),
            args = ?args,
            "Launching scanner"
        );

        let handle = self.launcher.launch(&args).await?;
        info!(pid = ?handle.pid(), "Scanner started");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::scanner::mocks::MockScannerLauncher;

    #[tokio::test]
    async fn test_missing_executable_fails_before_spawn() {
        let launcher = Arc::new(MockScannerLauncher::missing());
        let supervisor = ProcessSupervisor::new(launcher.clone());

        let result = supervisor.launch(&ScanRequest::new(2, 0.25, false)).await;

        assert!(matches!(result, Err(AppError::MissingExecutable(_))));
        assert_eq!(launcher.launch_count(), 0);
    }

    #[tokio::test]
    async fn test_launch_passes_ordered_args() {
        let launcher = Arc::new(MockScannerLauncher::new());
        let supervisor = ProcessSupervisor::new(launcher.clone());

        let handle = supervisor
            .launch(&ScanRequest::new(3, 0.5, true))
            .await
            .unwrap();

        assert!(handle.pid().is_some());
        assert_eq!(
            launcher.last_args(),
            Some(vec!["3".to_string(), "0.5".to_string(), "1".to_string()])
        );
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported() {
        let launcher = Arc::new(MockScannerLauncher::failing("access denied"));
        let supervisor = ProcessSupervisor::new(launcher);

        let result = supervisor.launch(&ScanRequest::new(2, 0.25, false)).await;
        assert!(matches!(result, Err(AppError::Launch(_))));
    }
}
