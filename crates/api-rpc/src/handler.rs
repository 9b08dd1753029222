//! RPC Method Handlers

use crate::error::to_rpc_error;
use crate::types::{StartScanRequest, StartScanResponse, StatusResponse};
use discscan_core::application::ScanOrchestrator;
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use tracing::info;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    orchestrator: Arc<ScanOrchestrator>,
}

impl RpcHandler {
    pub fn new(orchestrator: Arc<ScanOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// scan.start.v1
    pub async fn start_scan(
        &self,
        params: StartScanRequest,
    ) -> Result<StartScanResponse, ErrorObjectOwned> {
        info!(
            page_load = params.page_load,
            disc_scan = params.disc_scan,
            keep_images = params.keep_images,
            "scan.start.v1"
        );

        let session_id = self
            .orchestrator
            .start_scan(params.into())
            .await
            .map_err(to_rpc_error)?;

        Ok(StartScanResponse {
            session_id,
            state: "RUNNING".to_string(),
        })
    }

    /// scan.status.v1
    pub fn status(&self) -> Result<StatusResponse, ErrorObjectOwned> {
        Ok(self.orchestrator.status())
    }
}
