//! discscan Client Implementation

use crate::error::{Result, SdkError};
use crate::types::{ScanNotification, ScanStatus, StartScanRequest, StartScanResponse};
use jsonrpsee::core::client::{ClientT, Subscription, SubscriptionClientT};
use jsonrpsee::core::params::ObjectParams;
use jsonrpsee::rpc_params;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use std::time::Duration;

/// Default daemon endpoint (WebSocket, needed for event subscriptions)
pub const DEFAULT_URL: &str = "ws://127.0.0.1:9641";

/// Client for the discscan daemon
///
/// # Example
///
/// ```no_run
/// use discscan_sdk::{DiscscanClient, StartScanRequest};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = DiscscanClient::connect("ws://127.0.0.1:9641").await?;
/// let mut events = client.subscribe_events().await?;
/// let started = client
///     .start_scan(StartScanRequest { disc_scan: 0.25, page_load: 2, keep_images: false })
///     .await?;
/// let outcome = events.next_for(&started.session_id).await?;
/// println!("{:?}", outcome.event);
/// # Ok(())
/// # }
/// ```
pub struct DiscscanClient {
    client: WsClient,
}

impl DiscscanClient {
    /// Connect to the daemon
    ///
    /// # Arguments
    ///
    /// * `url` - WebSocket endpoint (e.g., `ws://127.0.0.1:9641`)
    pub async fn connect(url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref();

        let client = WsClientBuilder::default()
            .request_timeout(Duration::from_secs(30))
            .build(url)
            .await
            .map_err(|e| SdkError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        Ok(Self { client })
    }

    /// Start a scan; the outcome arrives later on the event stream
    pub async fn start_scan(&self, request: StartScanRequest) -> Result<StartScanResponse> {
        let params = start_params(&request)?;
        let response: StartScanResponse = self.client.request("scan.start.v1", params).await?;

        Ok(response)
    }

    /// Current session and last event
    pub async fn status(&self) -> Result<ScanStatus> {
        let response: ScanStatus = self.client.request("scan.status.v1", rpc_params![]).await?;
        Ok(response)
    }

    /// Subscribe to `scan-error` / `scan-complete` events
    ///
    /// Subscribe before starting a scan; events are not replayed.
    pub async fn subscribe_events(&self) -> Result<EventStream> {
        let subscription: Subscription<ScanNotification> = self
            .client
            .subscribe("scan.subscribe.v1", rpc_params![], "scan.unsubscribe.v1")
            .await?;

        Ok(EventStream { subscription })
    }
}

/// scan.start.v1 parameters, sent by name in the UI's field names
fn start_params(request: &StartScanRequest) -> Result<ObjectParams> {
    let mut params = ObjectParams::new();
    params.insert("discScan", request.disc_scan)?;
    params.insert("pageLoad", request.page_load)?;
    params.insert("keepImages", request.keep_images)?;
    Ok(params)
}

/// Stream of scan notifications
pub struct EventStream {
    subscription: Subscription<ScanNotification>,
}

impl EventStream {
    /// Next notification from any session
    pub async fn next(&mut self) -> Result<ScanNotification> {
        match self.subscription.next().await {
            Some(Ok(notification)) => Ok(notification),
            Some(Err(e)) => Err(SdkError::Serialization(e)),
            None => Err(SdkError::StreamClosed),
        }
    }

    /// Next notification of the given session, skipping others
    pub async fn next_for(&mut self, session_id: &str) -> Result<ScanNotification> {
        loop {
            let notification = self.next().await?;
            if notification.session_id == session_id {
                return Ok(notification);
            }
        }
    }
}
