// Change source selection

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::polling_watcher::PollingChangeSource;
use discscan_core::port::{ChangeSource, WatchError};

/// Backend used to observe the scanner log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    /// inotify where available, polling elsewhere
    #[default]
    Auto,
    Inotify,
    Poll,
}

impl std::str::FromStr for WatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(WatchMode::Auto),
            "inotify" => Ok(WatchMode::Inotify),
            "poll" => Ok(WatchMode::Poll),
            other => Err(format!("unknown watch mode '{}'", other)),
        }
    }
}

/// Build the change source for a mode
///
/// # Errors
/// - WatchError::Unsupported when inotify is requested off Linux
pub fn change_source_for(
    mode: WatchMode,
    poll_interval: Duration,
) -> Result<Arc<dyn ChangeSource>, WatchError> {
    let source: Arc<dyn ChangeSource> = match mode {
        WatchMode::Poll => Arc::new(PollingChangeSource::new(poll_interval)),
        #[cfg(target_os = "linux")]
        WatchMode::Auto | WatchMode::Inotify => {
            Arc::new(crate::inotify_watcher::InotifyChangeSource::new())
        }
        #[cfg(not(target_os = "linux"))]
        WatchMode::Auto => Arc::new(PollingChangeSource::new(poll_interval)),
        #[cfg(not(target_os = "linux"))]
        WatchMode::Inotify => {
            return Err(WatchError::Unsupported(
                "inotify is only available on Linux".to_string(),
            ))
        }
    };
    info!(mode = ?mode, "Log change source selected");
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modes() {
        assert_eq!("auto".parse::<WatchMode>().unwrap(), WatchMode::Auto);
        assert_eq!("POLL".parse::<WatchMode>().unwrap(), WatchMode::Poll);
        assert!("fanotify".parse::<WatchMode>().is_err());
    }

    #[test]
    fn test_poll_always_available() {
        assert!(change_source_for(WatchMode::Poll, Duration::from_millis(100)).is_ok());
        assert!(change_source_for(WatchMode::Auto, Duration::from_millis(100)).is_ok());
    }
}
