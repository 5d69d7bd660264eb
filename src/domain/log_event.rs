use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSeverity {
    Info,
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for LogSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogSeverity::Info => write!(f, "info"),
            LogSeverity::Success => write!(f, "success"),
            LogSeverity::Warning => write!(f, "warning"),
            LogSeverity::Error => write!(f, "error"),
        }
    }
}

/// A progress event emitted during a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub message: String,
    pub severity: LogSeverity,
    pub timestamp: DateTime<Utc>,
}

impl LogEvent {
    pub fn new(severity: LogSeverity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
            timestamp: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogSeverity::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogSeverity::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogSeverity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogSeverity::Error, message)
    }
}
