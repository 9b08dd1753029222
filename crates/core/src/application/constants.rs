// Session constants (No magic values)
use std::time::Duration;

/// Readiness polling: attempts before the log file is declared unavailable
pub const DEFAULT_READINESS_ATTEMPTS: u32 = 12;

/// Readiness polling: first backoff delay (250ms)
pub const DEFAULT_READINESS_BASE_DELAY: Duration = Duration::from_millis(250);

/// Readiness polling: backoff ceiling (2s)
pub const DEFAULT_READINESS_MAX_DELAY: Duration = Duration::from_secs(2);

/// Log reads attempted per change notice before the session fails
pub const DEFAULT_READ_RETRY_ATTEMPTS: u32 = 5;

/// First delay between failed log reads (50ms)
pub const DEFAULT_READ_RETRY_BASE_DELAY: Duration = Duration::from_millis(50);

/// Ceiling for delays between failed log reads (1s)
pub const DEFAULT_READ_RETRY_MAX_DELAY: Duration = Duration::from_secs(1);

/// Time the scanner gets to exit on its own after the outcome (10s)
pub const DEFAULT_EXIT_GRACE: Duration = Duration::from_secs(10);

/// Graceful process shutdown timeout between SIGTERM and SIGKILL (5s)
pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Polling interval of the portable change source (250ms)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Capacity of change notice channels
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;
