// Scan Orchestrator - start/status entry point for scan sessions
//
// At most one session runs at a time: the scanner drives the game window
// and writes to a single fixed log file.

use super::bridge::EventBridge;
use super::session_runner::{SessionReport, SessionRunner, SessionSettings};
use super::shutdown::ShutdownToken;
use super::supervisor::ProcessSupervisor;
use crate::domain::{ScanNotification, ScanRequest, ScanSession, SessionId};
use crate::error::{AppError, Result};
use crate::port::id_provider::UuidProvider;
use crate::port::time_provider::SystemTimeProvider;
use crate::port::{
    ArtifactRevealer, ChangeSource, EventSink, IdProvider, LogSource, ScannerLauncher,
    TimeProvider,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Snapshot of the orchestrator for status queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStatus {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event: Option<ScanNotification>,
}

struct ActiveScan {
    session_id: SessionId,
    started_at: i64,
    pid: Option<u32>,
}

#[derive(Default)]
struct Registry {
    active: Option<ActiveScan>,
    // Outlives the active slot so a finished session can still be joined
    task: Option<JoinHandle<SessionReport>>,
    last_event: Option<ScanNotification>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Remembers the last delivered event before forwarding it
struct TrackingSink {
    inner: Arc<dyn EventSink>,
    registry: Arc<Mutex<Registry>>,
}

impl EventSink for TrackingSink {
    fn emit(&self, notification: &ScanNotification) {
        lock(&self.registry).last_event = Some(notification.clone());
        self.inner.emit(notification);
    }
}

pub struct ScanOrchestrator {
    supervisor: ProcessSupervisor,
    log_source: Arc<dyn LogSource>,
    change_source: Arc<dyn ChangeSource>,
    bridge: Arc<EventBridge>,
    ids: Arc<dyn IdProvider>,
    time: Arc<dyn TimeProvider>,
    settings: SessionSettings,
    shutdown: ShutdownToken,
    registry: Arc<Mutex<Registry>>,
}

impl ScanOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        launcher: Arc<dyn ScannerLauncher>,
        log_source: Arc<dyn LogSource>,
        change_source: Arc<dyn ChangeSource>,
        sink: Arc<dyn EventSink>,
        revealer: Arc<dyn ArtifactRevealer>,
        artifact_path: impl Into<PathBuf>,
        settings: SessionSettings,
        shutdown: ShutdownToken,
    ) -> Self {
        let registry = Arc::new(Mutex::new(Registry::default()));
        let sink: Arc<dyn EventSink> = Arc::new(TrackingSink {
            inner: sink,
            registry: Arc::clone(&registry),
        });

        Self {
            supervisor: ProcessSupervisor::new(launcher),
            log_source,
            change_source,
            bridge: Arc::new(EventBridge::new(sink, revealer, artifact_path)),
            ids: Arc::new(UuidProvider),
            time: Arc::new(SystemTimeProvider),
            settings,
            shutdown,
            registry,
        }
    }

    /// Replace the id and clock sources (deterministic tests)
    pub fn with_providers(mut self, ids: Arc<dyn IdProvider>, time: Arc<dyn TimeProvider>) -> Self {
        self.ids = ids;
        self.time = time;
        self
    }

    /// Start a scan session
    ///
    /// Returns as soon as the scanner is running; the outcome is delivered
    /// later through the event sink.
    ///
    /// # Errors
    /// - AppError::Validation for unusable request values
    /// - AppError::Conflict if a session is already active or shutdown began
    /// - AppError::MissingExecutable / AppError::Launch if the scanner cannot start
    pub async fn start_scan(&self, request: ScanRequest) -> Result<SessionId> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if self.shutdown.is_shutdown() {
            return Err(AppError::Conflict("Shutdown in progress".to_string()));
        }

        let session_id = self.ids.generate_id();
        let started_at = self.time.now_millis();

        // Reserve the slot before any await so concurrent starts cannot both launch
        {
            let mut registry = lock(&self.registry);
            if let Some(active) = &registry.active {
                warn!(active = %active.session_id, "Scan already running, rejecting start");
                return Err(AppError::Conflict(format!(
                    "Scan {} is already running",
                    active.session_id
                )));
            }
            registry.active = Some(ActiveScan {
                session_id: session_id.clone(),
                started_at,
                pid: None,
            });
        }

        let baseline = self.log_source.fingerprint().await;

        let process = match self.supervisor.launch(&request).await {
            Ok(process) => process,
            Err(e) => {
                lock(&self.registry).active = None;
                return Err(e);
            }
        };
        let pid = process.pid();

        let session = ScanSession::new(
            session_id.clone(),
            request,
            self.log_source.path(),
            started_at,
            pid,
        );
        let runner = SessionRunner::new(
            session,
            process,
            baseline,
            Arc::clone(&self.log_source),
            Arc::clone(&self.change_source),
            Arc::clone(&self.bridge),
            self.settings.clone(),
            self.shutdown.clone(),
        );

        let registry = Arc::clone(&self.registry);
        let finished_id = session_id.clone();
        let task = tokio::spawn(async move {
            let report = runner.run().await;
            let mut registry = lock(&registry);
            if registry
                .active
                .as_ref()
                .is_some_and(|active| active.session_id == finished_id)
            {
                registry.active = None;
            }
            report
        });

        {
            let mut guard = lock(&self.registry);
            let registry = &mut *guard;
            match registry.active.as_mut() {
                Some(active) if active.session_id == session_id => {
                    active.pid = pid;
                    registry.task = Some(task);
                }
                // Already finished and cleared its slot
                None => registry.task = Some(task),
                // A newer session owns the slot
                Some(_) => {}
            }
        }

        info!(session_id = %session_id, pid = ?pid, "Scan session started");
        Ok(session_id)
    }

    pub fn status(&self) -> ScanStatus {
        let registry = lock(&self.registry);
        let now = self.time.now_millis();

        match &registry.active {
            Some(active) => ScanStatus {
                active: true,
                session_id: Some(active.session_id.clone()),
                pid: active.pid,
                started_at: Some(active.started_at),
                elapsed_ms: Some((now - active.started_at).max(0)),
                last_event: registry.last_event.clone(),
            },
            None => ScanStatus {
                active: false,
                session_id: None,
                pid: None,
                started_at: None,
                elapsed_ms: None,
                last_event: registry.last_event.clone(),
            },
        }
    }

    pub fn is_active(&self) -> bool {
        lock(&self.registry).active.is_some()
    }

    /// Wait for the latest session's task and take its report
    ///
    /// Works after the session already finished. Returns None when no
    /// session was started since the last join.
    pub async fn join_active(&self) -> Option<SessionReport> {
        let task = lock(&self.registry).task.take()?;

        match task.await {
            Ok(report) => Some(report),
            Err(e) => {
                error!(error = %e, "Scan session task failed");
                None
            }
        }
    }
}
