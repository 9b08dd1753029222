// Discscan Infrastructure - System Adapters
// Implements: ScannerLauncher, LogSource, ChangeSource, ArtifactRevealer

#[cfg(target_os = "linux")]
pub mod inotify_watcher;
pub mod log_file;
pub mod polling_watcher;
pub mod revealer;
pub mod subprocess_launcher;
pub mod watch_mode;

#[cfg(target_os = "linux")]
pub use inotify_watcher::InotifyChangeSource;
pub use log_file::LogFileSource;
pub use polling_watcher::PollingChangeSource;
pub use revealer::SystemRevealer;
pub use subprocess_launcher::SubprocessLauncher;
pub use watch_mode::{change_source_for, WatchMode};
