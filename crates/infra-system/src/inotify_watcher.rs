// inotify change source (Linux)
//
// A blocking thread reads the inotify descriptor and forwards notices to the
// session. Releasing the watch removes it from the kernel, which wakes the
// thread with IN_IGNORED so it can exit.

use async_trait::async_trait;
use nix::sys::inotify::{AddWatchFlags, InitFlags, Inotify, WatchDescriptor};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use discscan_core::application::constants::CHANGE_CHANNEL_CAPACITY;
use discscan_core::port::{ChangeKind, ChangeSource, LogWatch, WatchError};

fn watch_mask() -> AddWatchFlags {
    AddWatchFlags::IN_MODIFY
        | AddWatchFlags::IN_CLOSE_WRITE
        | AddWatchFlags::IN_ATTRIB
        | AddWatchFlags::IN_MOVE_SELF
        | AddWatchFlags::IN_DELETE_SELF
}

struct WatchState {
    inotify: Inotify,
    descriptor: Mutex<Option<WatchDescriptor>>,
    released: AtomicBool,
}

impl WatchState {
    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
        let descriptor = self
            .descriptor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(wd) = descriptor {
            if let Err(e) = self.inotify.rm_watch(wd) {
                debug!(error = %e, "inotify watch already gone");
            }
        }
    }

    /// Watch `path` again after the kernel dropped the previous watch
    ///
    /// Holds the descriptor lock across the released check so a concurrent
    /// release either sees the new descriptor or prevents it.
    fn reattach(&self, path: &Path) -> Reattach {
        let mut descriptor = self
            .descriptor
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.released.load(Ordering::SeqCst) {
            *descriptor = None;
            return Reattach::Released;
        }
        match self.inotify.add_watch(path, watch_mask()) {
            Ok(wd) => {
                *descriptor = Some(wd);
                Reattach::Attached
            }
            Err(e) => {
                *descriptor = None;
                Reattach::Gone(e)
            }
        }
    }
}

#[derive(Debug)]
enum Reattach {
    Attached,
    Released,
    Gone(nix::Error),
}

#[derive(Default)]
pub struct InotifyChangeSource;

impl InotifyChangeSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChangeSource for InotifyChangeSource {
    async fn watch(&self, path: &Path) -> Result<LogWatch, WatchError> {
        let unavailable = |reason: String| WatchError::Unavailable {
            path: path.display().to_string(),
            reason,
        };

        let inotify = Inotify::init(InitFlags::IN_CLOEXEC)
            .map_err(|e| unavailable(format!("inotify init failed: {e}")))?;
        let wd = inotify
            .add_watch(path, watch_mask())
            .map_err(|e| unavailable(format!("inotify add watch failed: {e}")))?;

        let state = Arc::new(WatchState {
            inotify,
            descriptor: Mutex::new(Some(wd)),
            released: AtomicBool::new(false),
        });

        let (tx, rx) = mpsc::channel(CHANGE_CHANNEL_CAPACITY);
        let reader_state = Arc::clone(&state);
        let reader_path = path.to_path_buf();
        std::thread::Builder::new()
            .name("discscan-inotify".to_string())
            .spawn(move || read_loop(reader_state, reader_path, tx))
            .map_err(|e| unavailable(format!("watch thread failed to start: {e}")))?;

        Ok(LogWatch::new(rx, move || state.release()))
    }
}

/// Forward a notice; false once the session stopped listening
fn forward(tx: &mpsc::Sender<ChangeKind>, kind: ChangeKind) -> bool {
    match tx.try_send(kind) {
        // Any pending notice already triggers a full re-read
        Ok(()) | Err(TrySendError::Full(_)) => true,
        Err(TrySendError::Closed(_)) => false,
    }
}

fn read_loop(state: Arc<WatchState>, path: PathBuf, tx: mpsc::Sender<ChangeKind>) {
    loop {
        let events = match state.inotify.read_events() {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "inotify read failed, stopping watch");
                return;
            }
        };

        if state.released.load(Ordering::SeqCst) {
            break;
        }

        for event in events {
            let mask = event.mask;

            if mask.contains(AddWatchFlags::IN_Q_OVERFLOW) {
                warn!("inotify queue overflow, forcing a full re-read");
                if !forward(&tx, ChangeKind::Overflow) {
                    return;
                }
                continue;
            }

            if mask.intersects(AddWatchFlags::IN_MOVE_SELF | AddWatchFlags::IN_DELETE_SELF) {
                if !forward(&tx, ChangeKind::Replaced) {
                    return;
                }
                continue;
            }

            if mask.contains(AddWatchFlags::IN_IGNORED) {
                // The watched inode is gone; follow the path if it was recreated
                match state.reattach(&path) {
                    Reattach::Attached => {
                        debug!(path = %path.display(), "Re-attached inotify watch");
                        if !forward(&tx, ChangeKind::Replaced) {
                            return;
                        }
                    }
                    Reattach::Released => break,
                    Reattach::Gone(e) => {
                        warn!(error = %e, path = %path.display(), "Log file vanished, stopping watch");
                        return;
                    }
                }
                continue;
            }

            if !forward(&tx, ChangeKind::Modified) {
                return;
            }
        }
    }
    debug!(path = %path.display(), "inotify watch released");
}
