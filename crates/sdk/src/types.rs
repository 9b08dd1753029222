//! SDK Request/Response Types
//!
//! Mirrors the JSON-RPC types from the api-rpc crate.

use serde::{Deserialize, Serialize};

/// Parameters of `scan.start.v1`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartScanRequest {
    pub disc_scan: f64,
    pub page_load: u32,
    pub keep_images: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartScanResponse {
    pub session_id: String,
    pub state: String,
}

/// A disc the scanner skipped
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedDisc {
    pub set: String,
    pub partition: String,
    pub main_stat: String,
    pub level: String,
    pub reason: String,
}

/// Terminal event of a scan session
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event")]
pub enum ScanEvent {
    #[serde(rename = "scan-error")]
    ScanError { message: String },
    #[serde(rename = "scan-complete")]
    ScanComplete {
        message: String,
        #[serde(rename = "failedDiscs", default)]
        failed_discs: Vec<FailedDisc>,
    },
}

/// Payload of `scan.event` notifications
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanNotification {
    pub session_id: String,
    pub event: ScanEvent,
}

/// Result of `scan.status.v1`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStatus {
    pub active: bool,
    pub session_id: Option<String>,
    pub pid: Option<u32>,
    pub started_at: Option<i64>,
    pub elapsed_ms: Option<i64>,
    pub last_event: Option<ScanNotification>,
}
