//! discscan CLI - Command-line interface for the discscan daemon

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use discscan_sdk::{DiscscanClient, FailedDisc, ScanEvent, StartScanRequest, DEFAULT_URL};
use std::time::Duration;
use tabled::{Table, Tabled};

#[derive(Parser)]
#[command(name = "discscan")]
#[command(about = "Disc scanner orchestration CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL (WebSocket)
    #[arg(long, env = "DISCSCAN_RPC_URL", default_value = DEFAULT_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scan and wait for its outcome
    Scan {
        /// Seconds to wait for each inventory page to load
        #[arg(long, default_value = "2")]
        page_load: u32,

        /// Seconds to spend on each disc
        #[arg(long, default_value = "0.25")]
        disc_scan: f64,

        /// Keep the captured screenshots
        #[arg(long)]
        keep_images: bool,

        /// Give up waiting after this many seconds (the scan keeps running)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Show the active scan and the last event
    Status,
}

#[derive(Tabled)]
struct FailedDiscRow {
    #[tabled(rename = "Set")]
    set: String,
    #[tabled(rename = "Slot")]
    partition: String,
    #[tabled(rename = "Main Stat")]
    main_stat: String,
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

impl From<FailedDisc> for FailedDiscRow {
    fn from(disc: FailedDisc) -> Self {
        Self {
            set: disc.set,
            partition: disc.partition,
            main_stat: disc.main_stat,
            level: disc.level,
            reason: disc.reason,
        }
    }
}

fn print_event(event: ScanEvent) -> Result<()> {
    match event {
        ScanEvent::ScanError { message } => {
            println!("{}", "✗ Scan failed".red().bold());
            println!("  {}", message);
            bail!("scan failed");
        }
        ScanEvent::ScanComplete {
            message,
            failed_discs,
        } => {
            println!("{}", format!("✓ {}", message).green().bold());
            if failed_discs.is_empty() {
                println!("  All discs scanned");
            } else {
                println!();
                println!(
                    "{}",
                    format!("{} disc(s) skipped:", failed_discs.len()).yellow()
                );
                let rows: Vec<FailedDiscRow> = failed_discs.into_iter().map(Into::into).collect();
                println!("{}", Table::new(rows));
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let client = DiscscanClient::connect(&cli.rpc_url)
        .await
        .context("Failed to connect to daemon")?;

    match cli.command {
        Commands::Scan {
            page_load,
            disc_scan,
            keep_images,
            timeout,
        } => {
            // Subscribe first so the outcome cannot slip past
            let mut events = client.subscribe_events().await?;

            let started = match client
                .start_scan(StartScanRequest {
                    disc_scan,
                    page_load,
                    keep_images,
                })
                .await
            {
                Ok(started) => started,
                Err(e) if e.is_busy() => bail!("A scan is already running"),
                Err(e) if e.is_missing_scanner() => {
                    bail!("Scanner not installed: {}", e)
                }
                Err(e) => return Err(e).context("Failed to start scan"),
            };

            println!(
                "{} {}",
                "Scan started:".cyan().bold(),
                started.session_id
            );
            println!("  Waiting for the scanner...");

            let wait = events.next_for(&started.session_id);
            let notification = match timeout {
                Some(secs) => tokio::time::timeout(Duration::from_secs(secs), wait)
                    .await
                    .context("Timed out waiting for the scan outcome")??,
                None => wait.await?,
            };

            println!();
            print_event(notification.event)?;
        }

        Commands::Status => {
            println!("{}", "Scanner Status".cyan().bold());
            println!();

            let status = client.status().await?;
            println!("  {} {}", "RPC URL:".bold(), cli.rpc_url);

            match (&status.session_id, status.active) {
                (Some(session_id), true) => {
                    println!("  {} {}", "State:".bold(), "SCANNING".green());
                    println!("  {} {}", "Session:".bold(), session_id);
                    if let Some(pid) = status.pid {
                        println!("  {} {}", "PID:".bold(), pid);
                    }
                    if let Some(elapsed) = status.elapsed_ms {
                        println!("  {} {:.1}s", "Elapsed:".bold(), elapsed as f64 / 1000.0);
                    }
                }
                _ => println!("  {} {}", "State:".bold(), "IDLE".yellow()),
            }

            if let Some(last) = status.last_event {
                println!();
                println!("  {} {}", "Last session:".bold(), last.session_id);
                match last.event {
                    ScanEvent::ScanError { message } => {
                        println!("  {} {}", "Result:".bold(), "ERROR".red());
                        println!("  {} {}", "Message:".bold(), message);
                    }
                    ScanEvent::ScanComplete { failed_discs, .. } => {
                        println!("  {} {}", "Result:".bold(), "COMPLETE".green());
                        println!("  {} {}", "Skipped discs:".bold(), failed_discs.len());
                    }
                }
            }
        }
    }

    Ok(())
}
