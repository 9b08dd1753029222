//! Log tail tracking
//!
//! The scanner log is re-read in full on every change notice. [`LogTail`]
//! turns each read into a [`LogSnapshot`] only when the newest line moved, so
//! bursts of notices for a single write are processed once.

/// Number of trailing lines the classifier inspects
pub const RECENT_WINDOW: usize = 3;

/// Non-empty, trimmed lines of one full read of the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSnapshot {
    lines: Vec<String>,
}

impl LogSnapshot {
    /// Split raw file contents into non-empty trimmed lines
    pub fn parse(content: &str) -> Self {
        let lines = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn newest(&self) -> Option<&str> {
        self.lines.last().map(String::as_str)
    }

    /// The last [`RECENT_WINDOW`] lines (fewer if the log is shorter)
    pub fn recent(&self) -> &[String] {
        let start = self.lines.len().saturating_sub(RECENT_WINDOW);
        &self.lines[start..]
    }
}

/// Last-line dedup state of one session
#[derive(Debug, Default, Clone)]
pub struct LogTail {
    last_line: Option<String>,
}

impl LogTail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_line(&self) -> Option<&str> {
        self.last_line.as_deref()
    }

    /// Feed a full read of the log. Returns a snapshot only when the newest
    /// line differs from the one seen on the previous call.
    pub fn observe(&mut self, content: &str) -> Option<LogSnapshot> {
        let snapshot = LogSnapshot::parse(content);
        let newest = snapshot.newest()?;

        if self.last_line.as_deref() == Some(newest) {
            return None;
        }
        self.last_line = Some(newest.to_string());
        Some(snapshot)
    }
}
