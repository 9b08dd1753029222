// Scan Session Domain Model

use super::error::{DomainError, Result};
use super::scan::{ScanOutcome, ScanRequest};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Session ID (UUID v4)
pub type SessionId = String;

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    /// Scanner launched, log file not ready yet
    AwaitingLog,
    /// Change watch attached to the log file
    Watching,
    /// Outcome produced and delivered
    Concluded,
    /// Stopped without an outcome (daemon shutdown)
    Aborted,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::AwaitingLog => write!(f, "AWAITING_LOG"),
            SessionPhase::Watching => write!(f, "WATCHING"),
            SessionPhase::Concluded => write!(f, "CONCLUDED"),
            SessionPhase::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// Scanner process lifecycle: running -> exited(code) -> reaped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessState {
    Running,
    Exited { code: Option<i32> },
    Reaped { code: Option<i32> },
}

impl std::fmt::Display for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessState::Running => write!(f, "RUNNING"),
            ProcessState::Exited { code } => write!(f, "EXITED({:?})", code),
            ProcessState::Reaped { code } => write!(f, "REAPED({:?})", code),
        }
    }
}

/// Live state of one in-flight scan
#[derive(Debug, Clone)]
pub struct ScanSession {
    pub id: SessionId,
    pub request: ScanRequest,
    pub log_path: PathBuf,
    pub started_at: i64, // epoch ms
    pub pid: Option<u32>,
    phase: SessionPhase,
    process: ProcessState,
    outcome: Option<ScanOutcome>,
}

impl ScanSession {
    pub fn new(
        id: impl Into<SessionId>,
        request: ScanRequest,
        log_path: impl Into<PathBuf>,
        started_at: i64,
        pid: Option<u32>,
    ) -> Self {
        Self {
            id: id.into(),
            request,
            log_path: log_path.into(),
            started_at,
            pid,
            phase: SessionPhase::AwaitingLog,
            process: ProcessState::Running,
            outcome: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn process_state(&self) -> ProcessState {
        self.process
    }

    pub fn outcome(&self) -> Option<&ScanOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, SessionPhase::Concluded | SessionPhase::Aborted)
    }

    pub fn process_running(&self) -> bool {
        self.process == ProcessState::Running
    }

    /// AWAITING_LOG -> WATCHING
    pub fn begin_watching(&mut self) -> Result<()> {
        match self.phase {
            SessionPhase::AwaitingLog => {
                self.phase = SessionPhase::Watching;
                Ok(())
            }
            from => Err(invalid_transition(from, SessionPhase::Watching)),
        }
    }

    /// Record the terminal outcome. Only the first outcome is accepted.
    pub fn conclude(&mut self, outcome: ScanOutcome) -> Result<&ScanOutcome> {
        match self.phase {
            SessionPhase::AwaitingLog | SessionPhase::Watching => {
                self.phase = SessionPhase::Concluded;
                Ok(self.outcome.insert(outcome))
            }
            from => Err(invalid_transition(from, SessionPhase::Concluded)),
        }
    }

    /// Stop without an outcome
    pub fn abort(&mut self) -> Result<()> {
        match self.phase {
            SessionPhase::AwaitingLog | SessionPhase::Watching => {
                self.phase = SessionPhase::Aborted;
                Ok(())
            }
            from => Err(invalid_transition(from, SessionPhase::Aborted)),
        }
    }

    /// RUNNING -> EXITED(code)
    pub fn record_exit(&mut self, code: Option<i32>) -> Result<()> {
        match self.process {
            ProcessState::Running => {
                self.process = ProcessState::Exited { code };
                Ok(())
            }
            from => Err(DomainError::InvalidStateTransition {
                from: from.to_string(),
                to: ProcessState::Exited { code }.to_string(),
            }),
        }
    }

    /// EXITED(code) -> REAPED(code)
    pub fn reap(&mut self) -> Result<()> {
        match self.process {
            ProcessState::Exited { code } => {
                self.process = ProcessState::Reaped { code };
                Ok(())
            }
            from => Err(DomainError::InvalidStateTransition {
                from: from.to_string(),
                to: "REAPED".to_string(),
            }),
        }
    }
}

fn invalid_transition(from: SessionPhase, to: SessionPhase) -> DomainError {
    DomainError::InvalidStateTransition {
        from: from.to_string(),
        to: to.to_string(),
    }
}
