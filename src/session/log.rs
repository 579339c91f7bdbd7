//! User-visible provisioning log.
//!
//! Lines are appended, timestamped, and forwarded to a host-supplied
//! [`LogSink`] as they happen. Nothing ever reads the log back to make a
//! decision.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

/// A single timestamped log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

/// Destination for provisioning log lines.
pub trait LogSink: Send + Sync {
    /// Receive one line. Called in append order.
    fn line(&self, line: &LogLine);
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl LogSink for NullSink {
    fn line(&self, _line: &LogLine) {}
}

/// Sink that keeps line texts in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every line received so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Whether any received line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn line(&self, line: &LogLine) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(line.text.clone());
    }
}

/// Append-only log owned by a provisioning session.
pub struct ProvisioningLog {
    lines: Mutex<Vec<LogLine>>,
    sink: Arc<dyn LogSink>,
}

impl ProvisioningLog {
    /// Create a log forwarding to `sink`.
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
            sink,
        }
    }

    /// Create a log with no sink.
    pub fn discard() -> Self {
        Self::new(Arc::new(NullSink))
    }

    /// Append a line and forward it to the sink.
    pub fn append(&self, text: impl Into<String>) {
        let line = LogLine {
            timestamp: Utc::now(),
            text: text.into(),
        };
        self.sink.line(&line);
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(line);
    }

    /// Snapshot of every line appended so far.
    pub fn lines(&self) -> Vec<LogLine> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ProvisioningLog {
    fn default() -> Self {
        Self::discard()
    }
}

impl std::fmt::Debug for ProvisioningLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningLog")
            .field("lines", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order_and_forwards() {
        let sink = Arc::new(MemorySink::new());
        let log = ProvisioningLog::new(sink.clone());

        log.append("first");
        log.append(String::from("second"));

        let texts: Vec<_> = log.lines().into_iter().map(|l| l.text).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(sink.lines(), vec!["first", "second"]);
    }

    #[test]
    fn timestamps_do_not_go_backwards() {
        let log = ProvisioningLog::discard();
        log.append("a");
        log.append("b");
        let lines = log.lines();
        assert!(lines[0].timestamp <= lines[1].timestamp);
    }

    #[test]
    fn discard_log_still_records() {
        let log = ProvisioningLog::discard();
        assert!(log.is_empty());
        log.append("kept");
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn memory_sink_contains() {
        let sink = MemorySink::new();
        sink.line(&LogLine {
            timestamp: Utc::now(),
            text: "Installing zotero-keeper".to_string(),
        });
        assert!(sink.contains("zotero-keeper"));
        assert!(!sink.contains("pubmed"));
    }
}
