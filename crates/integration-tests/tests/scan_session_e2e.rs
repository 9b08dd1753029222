//! Scan session end-to-end tests
//!
//! Runs the orchestrator with the real process, log file and change watch
//! adapters against a fake scanner: a shell script installed under the
//! scanner's executable name that writes a log the way the real one does.

#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use discscan_core::application::{
    shutdown_channel, Backoff, ScanOrchestrator, SessionSettings, ShutdownSender,
};
use discscan_core::domain::{ProcessState, ScanEvent, ScanRequest, SessionPhase};
use discscan_core::error::AppError;
use discscan_core::port::change_source::mocks::MockChangeSource;
use discscan_core::port::event_sink::mocks::RecordingEventSink;
use discscan_core::port::revealer::mocks::MockRevealer;
use discscan_core::port::ChangeSource;
use discscan_infra_system::{LogFileSource, PollingChangeSource, SubprocessLauncher};

use common::Installation;

const EVENT_WAIT: Duration = Duration::from_secs(10);

struct Harness {
    orchestrator: ScanOrchestrator,
    sink: Arc<RecordingEventSink>,
    revealer: Arc<MockRevealer>,
    _shutdown: ShutdownSender,
}

fn settings(exit_grace: Duration) -> SessionSettings {
    SessionSettings {
        readiness: Backoff::new(40, Duration::from_millis(10), Duration::from_millis(100)),
        read_retry: Backoff::new(3, Duration::from_millis(5), Duration::from_millis(20)),
        exit_grace,
        fallback_poll: Duration::from_millis(20),
    }
}

fn harness_with(
    installation: &Installation,
    change_source: Arc<dyn ChangeSource>,
    exit_grace: Duration,
) -> Harness {
    let sink = Arc::new(RecordingEventSink::new());
    let revealer = Arc::new(MockRevealer::new());
    let (shutdown, token) = shutdown_channel();

    let launcher = SubprocessLauncher::new(&installation.layout)
        .with_graceful_timeout(Duration::from_millis(500));
    let orchestrator = ScanOrchestrator::new(
        Arc::new(launcher),
        Arc::new(LogFileSource::new(installation.layout.log_file())),
        change_source,
        sink.clone(),
        revealer.clone(),
        installation.layout.artifact(),
        settings(exit_grace),
        token,
    );

    Harness {
        orchestrator,
        sink,
        revealer,
        _shutdown: shutdown,
    }
}

fn harness(installation: &Installation) -> Harness {
    harness_with(
        installation,
        Arc::new(PollingChangeSource::new(Duration::from_millis(20))),
        Duration::from_secs(5),
    )
}

fn request() -> ScanRequest {
    ScanRequest::new(2, 0.25, false)
}

/// Successful scan with one skipped disc
#[tokio::test]
async fn test_scan_complete_with_failed_discs() {
    let installation = Installation::with_scanner(
        r#"echo "INFO scanner started with $1 $2 $3" > "$log"
sleep 0.2
echo "ERROR Disc failed validation | Set: Woodpecker Electro | Partition: 4 | Main Stat: ATK% | Level: 15 | skipping: unreadable substat" >> "$log"
echo "INFO page 2" >> "$log"
echo "[]" > "$out/scan_data.json"
echo "INFO Writing scan data to file" >> "$log""#,
    );
    let h = harness(&installation);

    let session_id = h.orchestrator.start_scan(request()).await.unwrap();
    assert!(h.sink.wait_for(1, EVENT_WAIT).await, "no event delivered");

    let report = h.orchestrator.join_active().await.unwrap();
    assert_eq!(report.session.phase(), SessionPhase::Concluded);
    assert_eq!(
        report.session.process_state(),
        ProcessState::Reaped { code: Some(0) }
    );

    let events = h.sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].session_id, session_id);
    match &events[0].event {
        ScanEvent::ScanComplete {
            message,
            failed_discs,
        } => {
            assert_eq!(message, "Scan Complete.");
            assert_eq!(failed_discs.len(), 1);
            assert_eq!(failed_discs[0].set, "Woodpecker Electro");
            assert_eq!(failed_discs[0].main_stat, "ATK%");
            assert_eq!(failed_discs[0].reason, "unreadable substat");
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(h.revealer.revealed(), vec![installation.layout.artifact()]);

    let log = std::fs::read_to_string(installation.layout.log_file()).unwrap();
    assert!(log.contains("started with 2 0.25 0"));
}

/// CRITICAL line ends the scan with the newest line as message
#[tokio::test]
async fn test_critical_failure() {
    let installation = Installation::with_scanner(
        r#"echo "INFO scanner started" > "$log"
sleep 0.2
echo "CRITICAL: Game window not found" >> "$log"
exit 1"#,
    );
    let h = harness(&installation);

    h.orchestrator.start_scan(request()).await.unwrap();
    let report = h.orchestrator.join_active().await.unwrap();

    assert_eq!(
        report.notification.unwrap().event,
        ScanEvent::ScanError {
            message: "CRITICAL: Game window not found".to_string()
        }
    );
    assert_eq!(h.sink.count(), 1);
    assert!(h.revealer.revealed().is_empty());
}

/// Exit without any marker is reported as an error
#[tokio::test]
async fn test_nonzero_exit_without_markers() {
    let installation = Installation::with_scanner(
        r#"echo "INFO scanner started" > "$log"
sleep 0.2
exit 7"#,
    );
    let h = harness(&installation);

    h.orchestrator.start_scan(request()).await.unwrap();
    let report = h.orchestrator.join_active().await.unwrap();

    assert_eq!(
        report.notification.unwrap().event,
        ScanEvent::ScanError {
            message: "Scanner exited with code 7 before reporting a result".to_string()
        }
    );
}

/// Scanner that dies before writing its log
#[tokio::test]
async fn test_exit_before_log_appears() {
    let installation = Installation::with_scanner("exit 2");
    let h = harness(&installation);

    h.orchestrator.start_scan(request()).await.unwrap();
    let report = h.orchestrator.join_active().await.unwrap();

    assert_eq!(report.session.phase(), SessionPhase::Concluded);
    assert_eq!(report.notification.unwrap().event.name(), "scan-error");
}

/// A completed log from the previous run must not end the new session
#[tokio::test]
async fn test_stale_log_is_ignored() {
    let installation = Installation::with_scanner(
        r#"sleep 0.3
echo "INFO new run" > "$log"
echo "CRITICAL: OCR engine failed to load" >> "$log"
exit 1"#,
    );
    installation.write_previous_log("INFO old run\nINFO Writing scan data to file\n");
    let h = harness(&installation);

    h.orchestrator.start_scan(request()).await.unwrap();
    let report = h.orchestrator.join_active().await.unwrap();

    assert_eq!(
        report.notification.unwrap().event,
        ScanEvent::ScanError {
            message: "CRITICAL: OCR engine failed to load".to_string()
        }
    );
    assert_eq!(h.sink.count(), 1);
}

/// A scanner that lingers after reporting is terminated after the grace period
#[tokio::test]
async fn test_lingering_scanner_is_terminated() {
    let installation = Installation::with_scanner(
        r#"echo "INFO Writing scan data to file" > "$log"
sleep 30"#,
    );
    let h = harness_with(
        &installation,
        Arc::new(PollingChangeSource::new(Duration::from_millis(20))),
        Duration::from_millis(200),
    );

    h.orchestrator.start_scan(request()).await.unwrap();
    let report = tokio::time::timeout(EVENT_WAIT, h.orchestrator.join_active())
        .await
        .expect("session did not end")
        .unwrap();

    assert_eq!(report.notification.unwrap().event.name(), "scan-complete");
    // Killed by signal, so no exit code
    assert_eq!(
        report.session.process_state(),
        ProcessState::Reaped { code: None }
    );
}

/// Missing executable is reported to the caller, nothing runs
#[tokio::test]
async fn test_missing_executable() {
    let installation = Installation::new();
    let h = harness(&installation);

    let result = h.orchestrator.start_scan(request()).await;

    match result {
        Err(AppError::MissingExecutable(path)) => {
            assert_eq!(path, installation.root().join("ZZZ-Scanner-Tesseract.exe"))
        }
        other => panic!("expected MissingExecutable, got {:?}", other),
    }
    assert!(!h.orchestrator.is_active());
    assert_eq!(h.sink.count(), 0);
}

/// A watch that cannot be attached fails the session and stops the scanner
#[tokio::test]
async fn test_watch_failure_terminates_scanner() {
    let installation = Installation::with_scanner(
        r#"echo "INFO scanner started" > "$log"
sleep 30"#,
    );
    let h = harness_with(
        &installation,
        Arc::new(MockChangeSource::failing()),
        Duration::from_secs(5),
    );

    h.orchestrator.start_scan(request()).await.unwrap();
    let report = tokio::time::timeout(EVENT_WAIT, h.orchestrator.join_active())
        .await
        .expect("session did not end")
        .unwrap();

    match report.notification.unwrap().event {
        ScanEvent::ScanError { message } => {
            assert!(message.starts_with("Unable to watch scan log"), "{}", message)
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(matches!(
        report.session.process_state(),
        ProcessState::Reaped { .. }
    ));
}

/// Same scenario through the Linux inotify backend
#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_inotify_backend_completion() {
    use discscan_infra_system::InotifyChangeSource;

    let installation = Installation::with_scanner(
        r#"echo "INFO scanner started" > "$log"
sleep 0.2
echo "INFO page 1" >> "$log"
sleep 0.1
echo "INFO Writing scan data to file" >> "$log""#,
    );
    let h = harness_with(
        &installation,
        Arc::new(InotifyChangeSource::new()),
        Duration::from_secs(5),
    );

    h.orchestrator.start_scan(request()).await.unwrap();
    let report = h.orchestrator.join_active().await.unwrap();

    assert_eq!(report.notification.unwrap().event.name(), "scan-complete");
    assert_eq!(h.sink.count(), 1);
}
