// Outcome classification of the scanner log tail

use super::extractor::extract_failed_items;
use super::log_tail::LogSnapshot;
use crate::domain::ScanOutcome;

/// Substring the scanner writes on a fatal error
pub const FAILURE_MARKER: &str = "CRITICAL";

/// Substring the scanner writes when it saves the scan data
pub const COMPLETION_MARKER: &str = "Writing scan data to file";

/// Message reported with a successful scan
pub const SCAN_COMPLETE_MESSAGE: &str = "Scan Complete.";

/// Decide whether the newest log content ends the scan
///
/// Only the trailing window is inspected, since a marker line can be followed
/// by one or two trailer lines before the read happens. Failure wins over
/// completion.
pub fn classify(snapshot: &LogSnapshot) -> Option<ScanOutcome> {
    let recent = snapshot.recent();
    let newest = snapshot.newest()?;

    if recent.iter().any(|line| line.contains(FAILURE_MARKER)) {
        return Some(ScanOutcome::Failure {
            message: newest.to_string(),
        });
    }

    if recent.iter().any(|line| line.contains(COMPLETION_MARKER)) {
        return Some(ScanOutcome::Success {
            message: SCAN_COMPLETE_MESSAGE.to_string(),
            failed_items: extract_failed_items(snapshot.lines()),
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(lines: &[&str]) -> LogSnapshot {
        LogSnapshot::parse(&lines.join("\n"))
    }

    #[test]
    fn test_failure_uses_newest_line() {
        let outcome = classify(&snapshot(&["INFO starting", "CRITICAL: disc jam"])).unwrap();
        assert_eq!(
            outcome,
            ScanOutcome::Failure {
                message: "CRITICAL: disc jam".to_string()
            }
        );
    }

    #[test]
    fn test_failure_marker_followed_by_trailers() {
        let outcome = classify(&snapshot(&[
            "INFO page 3",
            "CRITICAL: game window lost",
            "INFO cleaning up",
            "INFO exiting",
        ]))
        .unwrap();
        assert_eq!(outcome.message(), "INFO exiting");
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_marker_outside_window_is_ignored() {
        let outcome = classify(&snapshot(&[
            "CRITICAL: old problem",
            "INFO a",
            "INFO b",
            "INFO c",
        ]));
        assert!(outcome.is_none());
    }

    #[test]
    fn test_failure_takes_priority_over_completion() {
        let outcome = classify(&snapshot(&[
            "Writing scan data to file",
            "CRITICAL: write failed",
        ]))
        .unwrap();
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_completion_with_failed_items() {
        let outcome = classify(&snapshot(&[
            "...",
            "ERROR Disc failed validation | Set: Foo | Partition: 3 | Main Stat: ATK | Level: 12 | skipping: bad OCR",
            "Writing scan data to file",
        ]))
        .unwrap();

        match outcome {
            ScanOutcome::Success {
                message,
                failed_items,
            } => {
                assert_eq!(message, SCAN_COMPLETE_MESSAGE);
                assert_eq!(failed_items.len(), 1);
                assert_eq!(failed_items[0].set, "Foo");
            }
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[test]
    fn test_no_marker_no_event() {
        assert!(classify(&snapshot(&["INFO page 1", "INFO page 2"])).is_none());
        assert!(classify(&LogSnapshot::parse("")).is_none());
    }
}
