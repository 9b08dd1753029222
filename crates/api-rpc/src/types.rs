//! RPC Request/Response Types
//!
//! Field names follow the UI's camelCase payloads.

use discscan_core::application::ScanStatus;
use discscan_core::domain::{ScanRequest, SessionId};
use jsonrpsee::types::{ErrorObjectOwned, Params};
use serde::{Deserialize, Serialize};

/// scan.start.v1 - Start a scan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartScanRequest {
    /// Seconds per disc (the UI offers 0.25 steps)
    pub disc_scan: f64,
    /// Seconds per inventory page
    pub page_load: u32,
    #[serde(default)]
    pub keep_images: bool,
}

impl StartScanRequest {
    /// Read the request by name, or as the single element of a positional array
    pub fn from_params(params: &Params<'_>) -> Result<Self, ErrorObjectOwned> {
        if params.is_object() {
            params.parse()
        } else {
            params.one()
        }
    }
}

impl From<StartScanRequest> for ScanRequest {
    fn from(req: StartScanRequest) -> Self {
        ScanRequest::new(req.page_load, req.disc_scan, req.keep_images)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartScanResponse {
    pub session_id: SessionId,
    pub state: String,
}

/// scan.status.v1 - Current session and last event (no parameters)
pub type StatusResponse = ScanStatus;
