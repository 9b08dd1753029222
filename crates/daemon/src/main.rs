//! discscan daemon - Main Entry Point
//! Hosts the scan orchestrator behind the JSON-RPC server

mod config;
mod logging;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

// Import workspace crates
use discscan_api_rpc::{BroadcastEventSink, RpcServer, RpcServerConfig};
use discscan_core::application::{shutdown_channel, ScanOrchestrator};
use discscan_core::domain::ScannerLayout;
use discscan_core::port::{ArtifactRevealer, NoopRevealer};
use discscan_infra_system::{change_source_for, LogFileSource, SubprocessLauncher, SystemRevealer};

use crate::config::DaemonConfig;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upper bound for the active session to stop after Ctrl+C
const SESSION_STOP_TIMEOUT: Duration = Duration::from_secs(15);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = DaemonConfig::load().context("Failed to load configuration")?;

    // 2. Initialize logging
    let _log_guard = logging::init(config.log_format, config.log_file_path().as_deref())?;

    info!("discscan daemon v{} starting...", VERSION);

    // 3. Resolve the scanner installation
    let layout = ScannerLayout::new(config.resolve_scanner_dir()?);
    info!(
        executable = %layout.executable().display(),
        log_file = %layout.log_file().display(),
        "Scanner layout resolved"
    );
    if !layout.executable().is_file() {
        warn!(
            executable = %layout.executable().display(),
            "Scanner executable not found; scan requests will fail until it is installed"
        );
    }

    // 4. Setup dependencies (DI wiring)
    let launcher = Arc::new(SubprocessLauncher::new(&layout));
    let log_source = Arc::new(LogFileSource::new(layout.log_file()));
    let change_source = change_source_for(config.watch_mode, config.poll_interval())
        .context("Failed to set up log change source")?;
    let events = Arc::new(BroadcastEventSink::new());
    let revealer: Arc<dyn ArtifactRevealer> = if config.reveal_artifact {
        Arc::new(SystemRevealer)
    } else {
        Arc::new(NoopRevealer)
    };

    let (shutdown_tx, shutdown_token) = shutdown_channel();
    let orchestrator = Arc::new(ScanOrchestrator::new(
        launcher,
        log_source,
        change_source,
        events.clone(),
        revealer,
        layout.artifact(),
        config.session_settings(),
        shutdown_token,
    ));

    // 5. Start JSON-RPC server
    let rpc_config = RpcServerConfig {
        host: config.rpc_host.clone(),
        port: config.rpc_port,
    };
    let (address, rpc_handle) = RpcServer::new(rpc_config, orchestrator.clone(), events)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(address = %address, "System ready. Waiting for scan requests...");
    info!("Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown: abort the session (terminates the scanner), then stop RPC
    shutdown_tx.shutdown();
    if tokio::time::timeout(SESSION_STOP_TIMEOUT, orchestrator.join_active())
        .await
        .is_err()
    {
        warn!("Scan session did not stop in time");
    }
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;

    info!("Shutdown complete.");

    Ok(())
}
