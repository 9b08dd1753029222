//! discscan SDK - Rust Client Library
//!
//! Starts scans on the discscan daemon and waits for their outcome.
//!
//! # Example
//!
//! ```no_run
//! use discscan_sdk::{DiscscanClient, ScanEvent, StartScanRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DiscscanClient::connect("ws://127.0.0.1:9641").await?;
//!     let mut events = client.subscribe_events().await?;
//!
//!     let started = client
//!         .start_scan(StartScanRequest { disc_scan: 0.25, page_load: 2, keep_images: false })
//!         .await?;
//!
//!     match events.next_for(&started.session_id).await?.event {
//!         ScanEvent::ScanError { message } => eprintln!("Scan failed: {}", message),
//!         ScanEvent::ScanComplete { failed_discs, .. } => {
//!             println!("Scan complete, {} discs skipped", failed_discs.len())
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod types;

pub use client::{DiscscanClient, EventStream, DEFAULT_URL};
pub use error::{Result, SdkError};
pub use types::{
    FailedDisc, ScanEvent, ScanNotification, ScanStatus, StartScanRequest, StartScanResponse,
};
