//! JSON-RPC Server
//!
//! HTTP and WebSocket on one TCP port, bound to localhost by default.

use crate::events::BroadcastEventSink;
use crate::handler::RpcHandler;
use crate::types::StartScanRequest;
use discscan_core::application::ScanOrchestrator;
use discscan_core::domain::ScanNotification;
use jsonrpsee::core::SubscriptionResult;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::{PendingSubscriptionSink, RpcModule, SubscriptionMessage};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9641;

pub const METHOD_START: &str = "scan.start.v1";
pub const METHOD_STATUS: &str = "scan.status.v1";
pub const METHOD_SUBSCRIBE: &str = "scan.subscribe.v1";
pub const NOTIFICATION_EVENT: &str = "scan.event";
pub const METHOD_UNSUBSCRIBE: &str = "scan.unsubscribe.v1";

/// RPC Server Configuration
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
    events: Arc<BroadcastEventSink>,
}

impl RpcServer {
    pub fn new(
        config: RpcServerConfig,
        orchestrator: Arc<ScanOrchestrator>,
        events: Arc<BroadcastEventSink>,
    ) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(orchestrator)),
            events,
        }
    }

    /// Start the JSON-RPC server
    ///
    /// Returns the bound address (port 0 picks a free port) and the server handle.
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let mut module = RpcModule::new(());

        // Register methods
        let handler = self.handler.clone();
        module
            .register_async_method(METHOD_START, move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req = StartScanRequest::from_params(&params)?;
                    handler.start_scan(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_method(METHOD_STATUS, move |_, _, _| handler.status())
            .map_err(|e| e.to_string())?;

        let events = self.events.clone();
        module
            .register_subscription(
                METHOD_SUBSCRIBE,
                NOTIFICATION_EVENT,
                METHOD_UNSUBSCRIBE,
                move |_, pending, _, _| {
                    let rx = events.subscribe();
                    forward_events(pending, rx)
                },
            )
            .map_err(|e| e.to_string())?;

        info!(address = %local_addr, "JSON-RPC server started");

        let handle = server.start(module);
        Ok((local_addr, handle))
    }
}

/// Push scan notifications to one subscriber until it goes away
async fn forward_events(
    pending: PendingSubscriptionSink,
    mut rx: broadcast::Receiver<ScanNotification>,
) -> SubscriptionResult {
    let sink = pending.accept().await?;
    debug!(subscription = ?sink.subscription_id(), "Event subscriber attached");

    loop {
        tokio::select! {
            _ = sink.closed() => break,
            received = rx.recv() => match received {
                Ok(notification) => {
                    let message = SubscriptionMessage::from_json(&notification)?;
                    if sink.send(message).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscriber lagged, notifications dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    debug!(subscription = ?sink.subscription_id(), "Event subscriber detached");
    Ok(())
}
