// Scanner Launcher Port
// Abstraction for starting the external scanner and observing its lifetime

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::oneshot;

/// Exit of the scanner process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, None when terminated by a signal or when the status was lost
    pub code: Option<i32>,
}

impl ProcessExit {
    pub fn with_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// Exit without a code (signal, or supervisor lost track of the child)
    pub fn unknown() -> Self {
        Self { code: None }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Launch errors
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),
}

/// Handle to a launched scanner, owned by the scan session
///
/// The adapter that spawned the child keeps the matching [`ProcessControl`]
/// and reports the exit through it.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: Option<u32>,
    exit_rx: oneshot::Receiver<ProcessExit>,
    kill_tx: Option<oneshot::Sender<()>>,
}

/// Adapter side of a [`ProcessHandle`]
#[derive(Debug)]
pub struct ProcessControl {
    /// Report the exit of the child (reaped)
    pub exit_tx: oneshot::Sender<ProcessExit>,
    /// Resolves with `Ok(())` when the session asks for termination
    pub kill_rx: oneshot::Receiver<()>,
}

impl ProcessHandle {
    /// Create a connected handle/control pair for a freshly spawned child
    pub fn channel(pid: Option<u32>) -> (ProcessHandle, ProcessControl) {
        let (exit_tx, exit_rx) = oneshot::channel();
        let (kill_tx, kill_rx) = oneshot::channel();
        (
            ProcessHandle {
                pid,
                exit_rx,
                kill_tx: Some(kill_tx),
            },
            ProcessControl { exit_tx, kill_rx },
        )
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Wait for the child to exit
    ///
    /// Cancel safe. Must not be polled again once it has returned.
    pub async fn wait_exit(&mut self) -> ProcessExit {
        (&mut self.exit_rx)
            .await
            .unwrap_or_else(|_| ProcessExit::unknown())
    }

    /// Ask the adapter to terminate the child. Returns false if already requested
    /// or the adapter is gone.
    pub fn request_kill(&mut self) -> bool {
        self.kill_tx
            .take()
            .map(|tx| tx.send(()).is_ok())
            .unwrap_or(false)
    }
}

/// Scanner Launcher trait
///
/// Implementations:
/// - SubprocessLauncher: spawns the real scanner executable
/// - MockScannerLauncher: in-memory child for tests
#[async_trait]
pub trait ScannerLauncher: Send + Sync {
    /// Path of the executable this launcher starts
    fn executable(&self) -> PathBuf;

    /// Check whether the executable is present on disk
    async fn executable_exists(&self) -> bool;

    /// Start the scanner with positional arguments, without waiting for it
    ///
    /// # Errors
    /// - LaunchError::SpawnFailed if the process cannot be started
    async fn launch(&self, args: &[String]) -> Result<ProcessHandle, LaunchError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// Mock scanner launcher
    ///
    /// Each launch spawns a task standing in for the child: it exits when the
    /// test calls [`MockScannerLauncher::exit_last`] or when a kill is requested.
    pub struct MockScannerLauncher {
        exists: AtomicBool,
        launches: Mutex<Vec<Vec<String>>>,
        running: Mutex<Vec<oneshot::Sender<ProcessExit>>>,
        killed: Arc<AtomicBool>,
        fail_spawn: Option<String>,
    }

    impl MockScannerLauncher {
        pub fn new() -> Self {
            Self {
                exists: AtomicBool::new(true),
                launches: Mutex::new(Vec::new()),
                running: Mutex::new(Vec::new()),
                killed: Arc::new(AtomicBool::new(false)),
                fail_spawn: None,
            }
        }

        pub fn missing() -> Self {
            let launcher = Self::new();
            launcher.exists.store(false, Ordering::SeqCst);
            launcher
        }

        pub fn failing(message: impl Into<String>) -> Self {
            Self {
                fail_spawn: Some(message.into()),
                ..Self::new()
            }
        }

        pub fn launch_count(&self) -> usize {
            self.launches.lock().unwrap().len()
        }

        pub fn last_args(&self) -> Option<Vec<String>> {
            self.launches.lock().unwrap().last().cloned()
        }

        pub fn was_killed(&self) -> bool {
            self.killed.load(Ordering::SeqCst)
        }

        /// Make the most recently launched child exit
        pub fn exit_last(&self, exit: ProcessExit) {
            if let Some(tx) = self.running.lock().unwrap().pop() {
                let _ = tx.send(exit);
            }
        }
    }

    impl Default for MockScannerLauncher {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ScannerLauncher for MockScannerLauncher {
        fn executable(&self) -> PathBuf {
            PathBuf::from("mock-scanner.exe")
        }

        async fn executable_exists(&self) -> bool {
            self.exists.load(Ordering::SeqCst)
        }

        async fn launch(&self, args: &[String]) -> Result<ProcessHandle, LaunchError> {
            if let Some(msg) = &self.fail_spawn {
                return Err(LaunchError::SpawnFailed(msg.clone()));
            }
            self.launches.lock().unwrap().push(args.to_vec());

            let pid = 1000 + self.launch_count() as u32;
            let (handle, control) = ProcessHandle::channel(Some(pid));
            let (finish_tx, finish_rx) = oneshot::channel::<ProcessExit>();
            self.running.lock().unwrap().push(finish_tx);

            let killed = Arc::clone(&self.killed);
            tokio::spawn(async move {
                let ProcessControl {
                    exit_tx,
                    mut kill_rx,
                } = control;
                let exit = tokio::select! {
                    Ok(exit) = finish_rx => exit,
                    Ok(()) = &mut kill_rx => {
                        killed.store(true, Ordering::SeqCst);
                        ProcessExit::unknown()
                    }
                    else => return,
                };
                let _ = exit_tx.send(exit);
            });

            Ok(handle)
        }
    }
}
