// Port Layer - Interfaces for external dependencies

pub mod change_source;
pub mod event_sink;
pub mod id_provider; // For deterministic testing
pub mod log_source;
pub mod revealer;
pub mod scanner;
pub mod time_provider;

// Re-exports
pub use change_source::{ChangeKind, ChangeSource, LogWatch, WatchError};
pub use event_sink::EventSink;
pub use id_provider::IdProvider;
pub use log_source::{LogFingerprint, LogSource};
pub use revealer::{ArtifactRevealer, NoopRevealer, RevealError};
pub use scanner::{LaunchError, ProcessControl, ProcessExit, ProcessHandle, ScannerLauncher};
pub use time_provider::TimeProvider;
