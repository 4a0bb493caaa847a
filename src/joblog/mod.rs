//! Job log sink
//!
//! Import jobs keep an itemized log of what happened to each page and link.
//! The log is user-facing (it ends up in the import report) and separate
//! from the process-level `tracing` output, although every entry is also
//! forwarded there.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Mutex;

/// Severity of a job log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    Status,
    Error,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status => f.write_str("STATUS"),
            Self::Error => f.write_str("ERROR"),
        }
    }
}

/// One job log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub kind: LogKind,
    pub category: String,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Destination for job log entries
pub trait ImportLog: Send + Sync {
    fn append_message(&self, kind: LogKind, category: &str, text: &str);

    fn status(&self, category: &str, text: &str) {
        self.append_message(LogKind::Status, category, text);
    }

    fn error(&self, category: &str, text: &str) {
        self.append_message(LogKind::Error, category, text);
    }
}

/// In-memory job log that mirrors entries to `tracing`
#[derive(Debug, Default)]
pub struct MemoryLog {
    messages: Mutex<Vec<LogMessage>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<LogMessage> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<LogMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.kind == LogKind::Error)
            .collect()
    }
}

impl ImportLog for MemoryLog {
    fn append_message(&self, kind: LogKind, category: &str, text: &str) {
        match kind {
            LogKind::Status => tracing::info!("[{}] {}", category, text),
            LogKind::Error => tracing::warn!("[{}] {}", category, text),
        }

        if let Ok(mut messages) = self.messages.lock() {
            messages.push(LogMessage {
                kind,
                category: category.to_string(),
                text: text.to_string(),
                at: Utc::now(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_keep_order_and_kind() {
        let log = MemoryLog::new();
        log.status("links", "found 3 links");
        log.error("links", "broken link");

        let messages = log.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].kind, LogKind::Status);
        assert_eq!(log.errors().len(), 1);
        assert_eq!(log.errors()[0].text, "broken link");
    }
}
