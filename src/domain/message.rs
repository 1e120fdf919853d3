use super::{Metadata, Severity};
use chrono::{DateTime, Utc};

/// A fully enriched message ready for encoding and transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct LogMessage {
    pub short_message: String,
    pub full_message: Option<String>,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub metadata: Metadata,
}

impl LogMessage {
    /// Create a message stamped with the current time.
    pub fn new(short_message: impl Into<String>, severity: Severity, metadata: Metadata) -> Self {
        Self {
            short_message: short_message.into(),
            full_message: None,
            severity,
            timestamp: Utc::now(),
            metadata,
        }
    }

    pub fn with_full_message(mut self, full_message: impl Into<String>) -> Self {
        self.full_message = Some(full_message.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
