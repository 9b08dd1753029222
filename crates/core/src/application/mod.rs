// Application Layer - Scan session use cases

pub mod backoff;
pub mod bridge;
pub mod classifier;
pub mod constants;
pub mod extractor;
pub mod log_tail;
pub mod orchestrator;
pub mod session_runner;
pub mod shutdown;
pub mod supervisor;

// Re-exports
pub use backoff::Backoff;
pub use bridge::EventBridge;
pub use classifier::classify;
pub use extractor::extract_failed_items;
pub use log_tail::{LogSnapshot, LogTail};
pub use orchestrator::{ScanOrchestrator, ScanStatus};
pub use session_runner::{SessionReport, SessionRunner, SessionSettings};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use supervisor::ProcessSupervisor;
