// Session Runner - drives one scan from launch to reaped process
//
// Phases:
// 1. wait (bounded backoff) until the scanner has written a fresh log
// 2. attach the change watch, read once, then re-read on every notice
// 3. the first classified outcome is delivered through the bridge
// 4. release the watch, give the scanner time to exit, terminate it otherwise
//
// All handlers run on this one task, so the tail state needs no lock.

use super::backoff::Backoff;
use super::bridge::EventBridge;
use super::classifier::classify;
use super::constants::*;
use super::log_tail::LogTail;
use super::shutdown::ShutdownToken;
use crate::domain::{ScanNotification, ScanOutcome, ScanSession, SessionPhase};
use crate::port::{ChangeSource, LogFingerprint, LogSource, ProcessExit, ProcessHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

/// Timing knobs of a session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Polling budget while waiting for the log file
    pub readiness: Backoff,
    /// Retry budget for a single log read
    pub read_retry: Backoff,
    /// Time the scanner gets to exit by itself after the outcome
    pub exit_grace: Duration,
    /// Re-read interval used when the change watch stops delivering notices
    pub fallback_poll: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            readiness: Backoff::new(
                DEFAULT_READINESS_ATTEMPTS,
                DEFAULT_READINESS_BASE_DELAY,
                DEFAULT_READINESS_MAX_DELAY,
            ),
            read_retry: Backoff::new(
                DEFAULT_READ_RETRY_ATTEMPTS,
                DEFAULT_READ_RETRY_BASE_DELAY,
                DEFAULT_READ_RETRY_MAX_DELAY,
            ),
            exit_grace: DEFAULT_EXIT_GRACE,
            fallback_poll: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Result of waiting for the log file
#[derive(Debug)]
enum Readiness {
    Ready,
    ProcessExited(ProcessExit),
    TimedOut(u32),
    Shutdown,
}

/// Final state of a finished session
#[derive(Debug)]
pub struct SessionReport {
    pub session: ScanSession,
    pub notification: Option<ScanNotification>,
}

pub struct SessionRunner {
    session: ScanSession,
    process: ProcessHandle,
    baseline: Option<LogFingerprint>,
    tail: LogTail,
    log_source: Arc<dyn LogSource>,
    change_source: Arc<dyn ChangeSource>,
    bridge: Arc<EventBridge>,
    settings: SessionSettings,
    shutdown: ShutdownToken,
    notification: Option<ScanNotification>,
    terminate_now: bool,
}

impl SessionRunner {
    /// `baseline` is the log fingerprint captured before launch; a log that
    /// still matches it belongs to a previous run.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: ScanSession,
        process: ProcessHandle,
        baseline: Option<LogFingerprint>,
        log_source: Arc<dyn LogSource>,
        change_source: Arc<dyn ChangeSource>,
        bridge: Arc<EventBridge>,
        settings: SessionSettings,
        shutdown: ShutdownToken,
    ) -> Self {
        Self {
            session,
            process,
            baseline,
            tail: LogTail::new(),
            log_source,
            change_source,
            bridge,
            settings,
            shutdown,
            notification: None,
            terminate_now: false,
        }
    }

    pub async fn run(mut self) -> SessionReport {
        info!(
            session_id = %self.session.id,
            log_path = %self.session.log_path.display(),
            "Waiting for scan log"
        );

        match self.await_log_ready().await {
            Readiness::Ready => self.watch_log().await,
            Readiness::ProcessExited(exit) => self.handle_exit(exit).await,
            Readiness::TimedOut(attempts) => {
                self.terminate_now = true;
                let message = format!(
                    "Scan log did not appear at {} after {} attempts",
                    self.session.log_path.display(),
                    attempts
                );
                self.conclude(ScanOutcome::Failure { message }).await;
            }
            Readiness::Shutdown => self.abort(),
        }

        self.finish_process().await;

        info!(
            session_id = %self.session.id,
            phase = %self.session.phase(),
            process = %self.session.process_state(),
            "Scan session ended"
        );

        SessionReport {
            session: self.session,
            notification: self.notification,
        }
    }

    async fn log_is_fresh(&self) -> bool {
        match self.log_source.fingerprint().await {
            Some(current) => Some(current) != self.baseline,
            None => false,
        }
    }

    async fn await_log_ready(&mut self) -> Readiness {
        let policy = self.settings.readiness;

        for attempt in 0..policy.max_attempts {
            if self.shutdown.is_shutdown() {
                return Readiness::Shutdown;
            }
            if self.log_is_fresh().await {
                debug!(session_id = %self.session.id, attempt, "Scan log ready");
                return Readiness::Ready;
            }

            let delay = policy.delay_for(attempt);
            tokio::select! {
                _ = sleep(delay) => {}
                exit = self.process.wait_exit() => return Readiness::ProcessExited(exit),
                _ = self.shutdown.wait() => return Readiness::Shutdown,
            }
        }

        if self.log_is_fresh().await {
            return Readiness::Ready;
        }
        Readiness::TimedOut(policy.max_attempts)
    }

    async fn watch_log(&mut self) {
        let path = self.log_source.path();
        let mut watch = match self.change_source.watch(&path).await {
            Ok(watch) => watch,
            Err(e) => {
                self.terminate_now = true;
                self.conclude(ScanOutcome::Failure {
                    message: format!("Unable to watch scan log: {}", e),
                })
                .await;
                return;
            }
        };

        if let Err(e) = self.session.begin_watching() {
            warn!(error = %e, "Unexpected session phase");
        }
        info!(session_id = %self.session.id, "Watching scan log");

        // Content written before the watch was attached
        self.process_change().await;

        let mut degraded = false;
        let mut fallback = tokio::time::interval(self.settings.fallback_poll);

        while !self.session.is_finished() {
            tokio::select! {
                notice = watch.next(), if !degraded => match notice {
                    Some(kind) => {
                        debug!(kind = ?kind, "Log change notice");
                        self.process_change().await;
                    }
                    None => {
                        warn!(
                            session_id = %self.session.id,
                            "Log watcher stopped, falling back to periodic reads"
                        );
                        degraded = true;
                    }
                },
                _ = fallback.tick(), if degraded => self.process_change().await,
                exit = self.process.wait_exit(), if self.session.process_running() => {
                    self.handle_exit(exit).await;
                }
                _ = self.shutdown.wait() => self.abort(),
            }
        }

        watch.release();
        debug!(session_id = %self.session.id, "Log watch released");
    }

    /// Full read of the log; classify when the newest line moved
    async fn process_change(&mut self) {
        let policy = self.settings.read_retry;
        let mut last_error = None;

        for attempt in 0..policy.max_attempts {
            match self.log_source.read_all().await {
                Ok(content) => {
                    if let Some(snapshot) = self.tail.observe(&content) {
                        debug!(newest = ?snapshot.newest(), "New scan log line");
                        if let Some(outcome) = classify(&snapshot) {
                            self.conclude(outcome).await;
                        }
                    }
                    return;
                }
                Err(e) => {
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = policy.max_attempts,
                        error = %e,
                        "Failed to read scan log"
                    );
                    last_error = Some(e);
                    if attempt + 1 < policy.max_attempts {
                        tokio::select! {
                            _ = sleep(policy.delay_for(attempt)) => {}
                            _ = self.shutdown.wait() => {
                                self.abort();
                                return;
                            }
                        }
                    }
                }
            }
        }

        let reason = last_error.map(|e| e.to_string()).unwrap_or_default();
        self.conclude(ScanOutcome::Failure {
            message: format!(
                "Unable to read scan log {}: {}",
                self.session.log_path.display(),
                reason
            ),
        })
        .await;
    }

    /// The scanner exited; settle the outcome if the log has not
    async fn handle_exit(&mut self, exit: ProcessExit) {
        info!(
            session_id = %self.session.id,
            code = ?exit.code,
            "Scanner exited"
        );
        if let Err(e) = self.session.record_exit(exit.code) {
            warn!(error = %e, "Unexpected process state");
        }
        if self.session.is_finished() {
            return;
        }

        // The last lines may have landed after the last notice
        if self.log_is_fresh().await {
            self.process_change().await;
            if self.session.is_finished() {
                return;
            }
        }

        let message = match exit.code {
            Some(0) => "Scanner exited without reporting a result".to_string(),
            Some(code) => format!("Scanner exited with code {} before reporting a result", code),
            None => "Scanner was terminated before reporting a result".to_string(),
        };
        self.conclude(ScanOutcome::Failure { message }).await;
    }

    async fn conclude(&mut self, outcome: ScanOutcome) {
        let outcome = match self.session.conclude(outcome) {
            Ok(outcome) => outcome.clone(),
            Err(e) => {
                warn!(error = %e, "Outcome already delivered, ignoring");
                return;
            }
        };
        let notification = self.bridge.deliver(&self.session.id, &outcome).await;
        self.notification = Some(notification);
    }

    fn abort(&mut self) {
        info!(session_id = %self.session.id, "Shutdown requested, aborting scan session");
        self.terminate_now = true;
        if let Err(e) = self.session.abort() {
            warn!(error = %e, "Unexpected session phase");
        }
    }

    /// Wait for the scanner to exit (terminating it when needed) and reap it
    async fn finish_process(&mut self) {
        if self.session.process_running() {
            let grace = if self.terminate_now || self.session.phase() == SessionPhase::Aborted {
                Duration::ZERO
            } else {
                self.settings.exit_grace
            };

            let exit = match timeout(grace, self.process.wait_exit()).await {
                Ok(exit) => exit,
                Err(_) => {
                    warn!(
                        session_id = %self.session.id,
                        pid = ?self.process.pid(),
                        "Scanner still running, terminating"
                    );
                    self.process.request_kill();
                    match timeout(GRACEFUL_SHUTDOWN_TIMEOUT * 2, self.process.wait_exit()).await {
                        Ok(exit) => exit,
                        Err(_) => {
                            error!(
                                pid = ?self.process.pid(),
                                "Scanner did not exit after termination request"
                            );
                            return;
                        }
                    }
                }
            };

            if let Err(e) = self.session.record_exit(exit.code) {
                warn!(error = %e, "Unexpected process state");
            }
        }

        if let Err(e) = self.session.reap() {
            debug!(error = %e, "Process not reaped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProcessState, ScanEvent, ScanRequest};
    use crate::port::change_source::mocks::MockChangeSource;
    use crate::port::event_sink::mocks::RecordingEventSink;
    use crate::port::log_source::mocks::MockLogSource;
    use crate::port::revealer::mocks::MockRevealer;
    use crate::port::scanner::mocks::MockScannerLauncher;
    use crate::application::shutdown::{shutdown_channel, ShutdownSender};
    use crate::port::ScannerLauncher;

    const WAIT: Duration = Duration::from_secs(2);

    fn fast_settings() -> SessionSettings {
        SessionSettings {
            readiness: Backoff::new(8, Duration::from_millis(5), Duration::from_millis(20)),
            read_retry: Backoff::new(3, Duration::from_millis(1), Duration::from_millis(5)),
            exit_grace: Duration::from_millis(50),
            fallback_poll: Duration::from_millis(10),
        }
    }

    struct Harness {
        log: Arc<MockLogSource>,
        changes: Arc<MockChangeSource>,
        sink: Arc<RecordingEventSink>,
        launcher: Arc<MockScannerLauncher>,
    }

    impl Harness {
        fn new(log: MockLogSource) -> Self {
            Self {
                log: Arc::new(log),
                changes: Arc::new(MockChangeSource::new()),
                sink: Arc::new(RecordingEventSink::new()),
                launcher: Arc::new(MockScannerLauncher::new()),
            }
        }

        async fn spawn(&self) -> tokio::task::JoinHandle<SessionReport> {
            self.spawn_with(fast_settings()).await.0
        }

        async fn spawn_with(
            &self,
            settings: SessionSettings,
        ) -> (tokio::task::JoinHandle<SessionReport>, ShutdownSender) {
            let baseline = self.log.fingerprint().await;
            let process = self.launcher.launch(&[]).await.unwrap();
            let session = ScanSession::new(
                "session-1",
                ScanRequest::new(2, 0.25, false),
                self.log.path(),
                0,
                process.pid(),
            );
            let bridge = Arc::new(EventBridge::new(
                self.sink.clone(),
                Arc::new(MockRevealer::new()),
                "scan_data.json",
            ));
            let (shutdown, token) = shutdown_channel();
            let runner = SessionRunner::new(
                session,
                process,
                baseline,
                self.log.clone(),
                self.changes.clone(),
                bridge,
                settings,
                token,
            );
            (tokio::spawn(runner.run()), shutdown)
        }

        async fn wait_for_watch(&self) {
            for _ in 0..200 {
                if self.changes.watch_count() > 0 {
                    return;
                }
                sleep(Duration::from_millis(5)).await;
            }
            panic!("watch was never attached");
        }
    }

    #[tokio::test]
    async fn test_failure_marker_emits_single_error() {
        let h = Harness::new(MockLogSource::absent());
        let task = h.spawn().await;

        h.log.set_lines(&["INFO scanning page 1"]);
        h.wait_for_watch().await;

        h.log.append_line("CRITICAL: disc jam");
        h.changes.notify().await;
        assert!(h.sink.wait_for(1, WAIT).await);

        // Burst of notices for the same content
        h.changes.notify().await;
        h.changes.notify().await;
        h.launcher.exit_last(ProcessExit::with_code(1));

        let report = task.await.unwrap();
        let events = h.sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].event,
            ScanEvent::ScanError {
                message: "CRITICAL: disc jam".to_string()
            }
        );
        assert_eq!(report.session.phase(), SessionPhase::Concluded);
        assert_eq!(
            report.session.process_state(),
            ProcessState::Reaped { code: Some(1) }
        );
        assert!(h.changes.is_released());
    }

    #[tokio::test]
    async fn test_completion_marker_emits_complete() {
        let h = Harness::new(MockLogSource::absent());
        let task = h.spawn().await;

        h.log.set_lines(&["INFO start"]);
        h.wait_for_watch().await;

        h.log.append_line("ERROR Disc failed validation | Set: Foo | Partition: 3 | Main Stat: ATK | Level: 12 | skipping: bad OCR");
        h.log.append_line("INFO Writing scan data to file");
        h.changes.notify().await;
        assert!(h.sink.wait_for(1, WAIT).await);
        h.launcher.exit_last(ProcessExit::with_code(0));

        let report = task.await.unwrap();
        match &report.notification.unwrap().event {
            ScanEvent::ScanComplete {
                message,
                failed_discs,
            } => {
                assert_eq!(message, "Scan Complete.");
                assert_eq!(failed_discs.len(), 1);
                assert_eq!(failed_discs[0].level, "12");
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(h.sink.count(), 1);
    }

    #[tokio::test]
    async fn test_stale_log_is_not_ready() {
        // Left over from the previous run
        let h = Harness::new(MockLogSource::with_lines(&["INFO Writing scan data to file"]));
        let task = h.spawn().await;

        sleep(Duration::from_millis(20)).await;
        assert_eq!(h.sink.count(), 0, "stale completion must not be reported");

        h.log.set_lines(&["INFO new run", "CRITICAL: game not running"]);
        assert!(h.sink.wait_for(1, WAIT).await);
        h.launcher.exit_last(ProcessExit::with_code(1));

        let report = task.await.unwrap();
        assert_eq!(
            report.notification.unwrap().event,
            ScanEvent::ScanError {
                message: "CRITICAL: game not running".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_log_never_appears_fails_and_terminates() {
        let h = Harness::new(MockLogSource::absent());
        let task = h.spawn().await;

        let report = task.await.unwrap();
        let notification = report.notification.unwrap();
        match notification.event {
            ScanEvent::ScanError { message } => {
                assert!(message.contains("did not appear"), "{}", message)
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(h.launcher.was_killed());
        assert_eq!(h.changes.watch_count(), 0);
    }

    #[tokio::test]
    async fn test_nonzero_exit_without_markers() {
        let h = Harness::new(MockLogSource::absent());
        let task = h.spawn().await;

        h.log.set_lines(&["INFO scanning"]);
        h.wait_for_watch().await;
        h.launcher.exit_last(ProcessExit::with_code(3));

        let report = task.await.unwrap();
        assert_eq!(
            report.notification.unwrap().event,
            ScanEvent::ScanError {
                message: "Scanner exited with code 3 before reporting a result".to_string()
            }
        );
        assert_eq!(h.sink.count(), 1);
    }

    #[tokio::test]
    async fn test_exit_picks_up_unnotified_marker() {
        let h = Harness::new(MockLogSource::absent());
        let task = h.spawn().await;

        h.log.set_lines(&["INFO scanning"]);
        h.wait_for_watch().await;

        // Final write without a change notice
        h.log.append_line("Writing scan data to file");
        h.launcher.exit_last(ProcessExit::with_code(0));

        let report = task.await.unwrap();
        assert!(matches!(
            report.notification.unwrap().event,
            ScanEvent::ScanComplete { .. }
        ));
    }

    #[tokio::test]
    async fn test_read_failures_are_retried() {
        let h = Harness::new(MockLogSource::absent());
        let task = h.spawn().await;

        h.log.set_lines(&["INFO scanning"]);
        h.wait_for_watch().await;

        h.log.fail_next_reads(2);
        h.log.append_line("CRITICAL: out of memory");
        h.changes.notify().await;
        assert!(h.sink.wait_for(1, WAIT).await);
        h.launcher.exit_last(ProcessExit::with_code(1));

        let report = task.await.unwrap();
        assert_eq!(
            report.notification.unwrap().event.name(),
            "scan-error"
        );
    }

    #[tokio::test]
    async fn test_persistent_read_failure_surfaces() {
        let h = Harness::new(MockLogSource::absent());
        let task = h.spawn().await;

        h.log.set_lines(&["INFO scanning"]);
        h.wait_for_watch().await;

        h.log.fail_next_reads(100);
        h.changes.notify().await;

        let report = task.await.unwrap();
        match report.notification.unwrap().event {
            ScanEvent::ScanError { message } => {
                assert!(message.starts_with("Unable to read scan log"), "{}", message)
            }
            other => panic!("unexpected event {:?}", other),
        }
        // Scanner did not exit on its own within the grace period
        assert!(h.launcher.was_killed());
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_read_retry() {
        let h = Harness::new(MockLogSource::absent());
        let settings = SessionSettings {
            read_retry: Backoff::new(10, Duration::from_secs(5), Duration::from_secs(5)),
            ..fast_settings()
        };
        let (task, shutdown) = h.spawn_with(settings).await;

        h.log.set_lines(&["INFO scanning"]);
        h.wait_for_watch().await;
        // Initial read after attaching the watch
        while h.log.read_count() < 1 {
            sleep(Duration::from_millis(5)).await;
        }
        sleep(Duration::from_millis(20)).await;

        h.log.fail_next_reads(100);
        h.changes.notify().await;
        while h.log.read_count() < 2 {
            sleep(Duration::from_millis(5)).await;
        }
        shutdown.shutdown();

        let report = tokio::time::timeout(WAIT, task)
            .await
            .expect("retry backoff ignored shutdown")
            .unwrap();
        assert_eq!(report.session.phase(), SessionPhase::Aborted);
        assert!(report.notification.is_none());
        assert_eq!(h.sink.count(), 0);
        assert!(h.launcher.was_killed());
    }
}
