use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Severity of a log event. Ordering follows increasing severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical log record carried end-to-end through the pipeline.
///
/// The `timestamp` string is the authoritative on-wire form; the consumer
/// re-parses it only to route the document to a per-day index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: String,
    pub level: LogLevel,
    pub service: String,
    pub trace_id: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "payload_is_empty")]
    pub payload: Option<Map<String, Value>>,
}

fn payload_is_empty(payload: &Option<Map<String, Value>>) -> bool {
    payload.as_ref().map_or(true, |map| map.is_empty())
}
