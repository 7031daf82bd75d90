//! Injectable diagnostic sink.
//!
//! Components report skipped mappings, dropped document entries and no-op
//! group operations through [`DiagnosticLog`] rather than a global logger, so
//! tests can assert on what was reported.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

pub trait DiagnosticLog: Send + Sync {
    fn log(&self, scope: &str, message: &str, data: Option<&serde_json::Value>);
}

/// Forwards entries to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl DiagnosticLog for TracingLog {
    fn log(&self, scope: &str, message: &str, data: Option<&serde_json::Value>) {
        match data {
            Some(data) => tracing::debug!(scope, data = %data, "{message}"),
            None => tracing::debug!(scope, "{message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub scope: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Records entries in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True when some entry in `scope` mentions `needle` in its message.
    pub fn contains(&self, scope: &str, needle: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|entry| entry.scope == scope && entry.message.contains(needle))
    }
}

impl DiagnosticLog for MemoryLog {
    fn log(&self, scope: &str, message: &str, data: Option<&serde_json::Value>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogEntry {
                scope: scope.to_string(),
                message: message.to_string(),
                data: data.cloned(),
            });
    }
}
