// Subprocess launcher for the scanner executable
// reason: tokio for async process management, nix for graceful termination
use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use discscan_core::application::constants::GRACEFUL_SHUTDOWN_TIMEOUT;
use discscan_core::domain::ScannerLayout;
use discscan_core::port::{
    LaunchError, ProcessControl, ProcessExit, ProcessHandle, ScannerLauncher,
};

/// Spawns the scanner as a detached child of the daemon
///
/// The child runs with the installation directory as working directory so it
/// finds its bundled runtime. Its console output is discarded; progress is
/// only ever read from the log file.
pub struct SubprocessLauncher {
    executable: PathBuf,
    working_dir: PathBuf,
    graceful_timeout: Duration,
}

impl SubprocessLauncher {
    pub fn new(layout: &ScannerLayout) -> Self {
        Self {
            executable: layout.executable(),
            working_dir: layout.root().to_path_buf(),
            graceful_timeout: GRACEFUL_SHUTDOWN_TIMEOUT,
        }
    }

    /// Launcher for an arbitrary program (integration tests use a shell script)
    pub fn with_executable(executable: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            working_dir: working_dir.into(),
            graceful_timeout: GRACEFUL_SHUTDOWN_TIMEOUT,
        }
    }

    pub fn with_graceful_timeout(mut self, graceful_timeout: Duration) -> Self {
        self.graceful_timeout = graceful_timeout;
        self
    }
}

#[async_trait]
impl ScannerLauncher for SubprocessLauncher {
    fn executable(&self) -> PathBuf {
        self.executable.clone()
    }

    async fn executable_exists(&self) -> bool {
        tokio::fs::metadata(&self.executable)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    async fn launch(&self, args: &[String]) -> Result<ProcessHandle, LaunchError> {
        let child = Command::new(&self.executable)
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LaunchError::SpawnFailed(e.to_string()))?;

        let pid = child.id();
        info!(
            executable = %self.executable.display(),
            pid = ?pid,
            "Scanner process spawned"
        );

        let (handle, control) = ProcessHandle::channel(pid);
        tokio::spawn(supervise(child, control, self.graceful_timeout));
        Ok(handle)
    }
}

/// Own the child until it exits, terminating it on request
async fn supervise(mut child: Child, control: ProcessControl, graceful_timeout: Duration) {
    let ProcessControl {
        exit_tx,
        mut kill_rx,
    } = control;

    let status = tokio::select! {
        status = child.wait() => status,
        Ok(()) = &mut kill_rx => terminate(&mut child, graceful_timeout).await,
    };

    let exit = match status {
        Ok(status) => ProcessExit { code: status.code() },
        Err(e) => {
            warn!(error = %e, "Failed to wait for scanner process");
            ProcessExit::unknown()
        }
    };
    debug!(code = ?exit.code, "Scanner process reaped");
    let _ = exit_tx.send(exit);
}

/// SIGTERM first, SIGKILL after the timeout (plain kill elsewhere)
async fn terminate(child: &mut Child, graceful_timeout: Duration) -> io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            info!(pid = %pid, "Sending SIGTERM to scanner");
            match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                Ok(()) => {
                    if let Ok(status) = tokio::time::timeout(graceful_timeout, child.wait()).await {
                        info!(pid = %pid, "Scanner exited after SIGTERM");
                        return status;
                    }
                    warn!(pid = %pid, "Scanner did not exit after SIGTERM, sending SIGKILL");
                }
                Err(e) => warn!(pid = %pid, error = %e, "SIGTERM failed"),
            }
        }
    }

    #[cfg(not(unix))]
    let _ = graceful_timeout;

    child.kill().await?;
    child.wait().await
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;
    use tokio::time::timeout;

    fn script(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("scanner.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_exit_code_is_reported() {
        let dir = TempDir::new().unwrap();
        let launcher = SubprocessLauncher::with_executable(script(&dir, "exit 3"), dir.path());

        assert!(launcher.executable_exists().await);
        let mut handle = launcher.launch(&[]).await.unwrap();

        assert!(handle.pid().is_some());
        assert_eq!(handle.wait_exit().await, ProcessExit::with_code(3));
    }

    #[tokio::test]
    async fn test_args_and_working_dir() {
        let dir = TempDir::new().unwrap();
        let launcher = SubprocessLauncher::with_executable(
            script(&dir, "echo \"$1 $2 $3\" > args.txt"),
            dir.path(),
        );

        let mut handle = launcher
            .launch(&["2".to_string(), "0.25".to_string(), "0".to_string()])
            .await
            .unwrap();
        assert!(handle.wait_exit().await.success());

        let written = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert_eq!(written.trim(), "2 0.25 0");
    }

    #[tokio::test]
    async fn test_kill_request_terminates() {
        let dir = TempDir::new().unwrap();
        let launcher = SubprocessLauncher::with_executable(script(&dir, "sleep 30"), dir.path())
            .with_graceful_timeout(Duration::from_millis(500));

        let mut handle = launcher.launch(&[]).await.unwrap();
        assert!(handle.request_kill());

        let exit = timeout(Duration::from_secs(5), handle.wait_exit())
            .await
            .unwrap();
        assert!(!exit.success());
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let dir = TempDir::new().unwrap();
        let launcher =
            SubprocessLauncher::with_executable(dir.path().join("nope.exe"), dir.path());

        assert!(!launcher.executable_exists().await);
        assert!(matches!(
            launcher.launch(&[]).await,
            Err(LaunchError::SpawnFailed(_))
        ));
    }
}
