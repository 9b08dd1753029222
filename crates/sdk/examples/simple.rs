//! Simple SDK Example
//!
//! Starts one scan and prints its outcome.
//!
//! # Usage
//!
//! 1. Start the daemon:
//!    ```bash
//!    cargo run --package discscan-daemon
//!    ```
//!
//! 2. Run this example:
//!    ```bash
//!    cargo run --package discscan-sdk --example simple
//!    ```

use discscan_sdk::{DiscscanClient, ScanEvent, StartScanRequest, DEFAULT_URL};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("discscan SDK - Simple Example");
    println!("=============================\n");

    // 1. Connect to daemon
    println!("1. Connecting to daemon...");
    let client = DiscscanClient::connect(DEFAULT_URL).await?;
    println!("   ✓ Connected\n");

    // 2. Subscribe before starting so the outcome cannot be missed
    let mut events = client.subscribe_events().await?;

    // 3. Start a scan
    println!("2. Starting a scan...");
    let started = client
        .start_scan(StartScanRequest {
            disc_scan: 0.25,
            page_load: 2,
            keep_images: false,
        })
        .await?;
    println!("   ✓ Session {} ({})\n", started.session_id, started.state);

    // 4. Wait for the outcome
    println!("3. Waiting for the scanner...");
    let notification = events.next_for(&started.session_id).await?;
    match notification.event {
        ScanEvent::ScanError { message } => println!("   ✗ {}", message),
        ScanEvent::ScanComplete {
            message,
            failed_discs,
        } => {
            println!("   ✓ {}", message);
            for disc in failed_discs {
                println!(
                    "     - {} [{}] {} Lv.{}: {}",
                    disc.set, disc.partition, disc.main_stat, disc.level, disc.reason
                );
            }
        }
    }

    Ok(())
}
