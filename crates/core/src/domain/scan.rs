// Scan Domain Model

use super::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Scanner executable name inside the install directory
pub const SCANNER_EXECUTABLE: &str = "ZZZ-Scanner-Tesseract.exe";

/// Output directory relative to the install directory
pub const SCAN_OUTPUT_DIR: &str = "_internal/scan_output";

/// Log file written by the scanner inside the output directory
pub const SCAN_LOG_FILE: &str = "log.txt";

/// Scan artifact written by the scanner inside the output directory
pub const SCAN_ARTIFACT_FILE: &str = "scan_data.json";

/// Parameters for one scan, as chosen in the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Seconds to wait for an inventory page to load
    pub page_load_seconds: u32,
    /// Seconds to spend on each disc
    pub disc_scan_seconds: f64,
    /// Keep the captured screenshots after the scan
    pub keep_images: bool,
}

impl ScanRequest {
    pub fn new(page_load_seconds: u32, disc_scan_seconds: f64, keep_images: bool) -> Self {
        Self {
            page_load_seconds,
            disc_scan_seconds,
            keep_images,
        }
    }

    /// Reject values the scanner cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.page_load_seconds == 0 {
            return Err(DomainError::ValidationError(
                "pageLoad must be a positive integer".to_string(),
            ));
        }
        if !self.disc_scan_seconds.is_finite() || self.disc_scan_seconds <= 0.0 {
            return Err(DomainError::ValidationError(format!(
                "discScan must be a positive number, got {}",
                self.disc_scan_seconds
            )));
        }
        Ok(())
    }

    /// Positional arguments in the order the scanner expects:
    /// page load, disc scan, keep-images flag ("0"/"1")
    pub fn launch_args(&self) -> Vec<String> {
        vec![
            self.page_load_seconds.to_string(),
            self.disc_scan_seconds.to_string(),
            if self.keep_images { "1" } else { "0" }.to_string(),
        ]
    }
}

/// Well-known paths of a scanner installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerLayout {
    root: PathBuf,
}

impl ScannerLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn executable(&self) -> PathBuf {
        self.root.join(SCANNER_EXECUTABLE)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(SCAN_OUTPUT_DIR)
    }

    pub fn log_file(&self) -> PathBuf {
        self.output_dir().join(SCAN_LOG_FILE)
    }

    pub fn artifact(&self) -> PathBuf {
        self.output_dir().join(SCAN_ARTIFACT_FILE)
    }
}

/// A disc the scanner skipped because it failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedItemRecord {
    pub set: String,
    pub partition: String,
    pub main_stat: String,
    pub level: String,
    pub reason: String,
}

/// Terminal result of a scan session
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Failure {
        message: String,
    },
    Success {
        message: String,
        failed_items: Vec<FailedItemRecord>,
    },
}

impl ScanOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ScanOutcome::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            ScanOutcome::Failure { message } | ScanOutcome::Success { message, .. } => message,
        }
    }
}

/// Event delivered across the UI boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ScanEvent {
    #[serde(rename = "scan-error")]
    ScanError { message: String },

    #[serde(rename = "scan-complete", rename_all = "camelCase")]
    ScanComplete {
        message: String,
        failed_discs: Vec<FailedItemRecord>,
    },
}

impl ScanEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ScanEvent::ScanError { .. } => "scan-error",
            ScanEvent::ScanComplete { .. } => "scan-complete",
        }
    }
}

impl From<&ScanOutcome> for ScanEvent {
    fn from(outcome: &ScanOutcome) -> Self {
        match outcome {
            ScanOutcome::Failure { message } => ScanEvent::ScanError {
                message: message.clone(),
            },
            ScanOutcome::Success {
                message,
                failed_items,
            } => ScanEvent::ScanComplete {
                message: message.clone(),
                failed_discs: failed_items.clone(),
            },
        }
    }
}

/// Event tagged with the session that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanNotification {
    pub session_id: String,
    pub event: ScanEvent,
}
