//! Domain layer for graylog-reporter.
//!
//! Contains the canonical types shared across all modules:
//! - `ExceptionEvent`: An error captured at the call site, ready for reporting
//! - `Metadata`: Ordered key/value envelope attached to every message
//! - `LogMessage`: The pipeline's core data type handed to the encoder
//! - `Severity`: Syslog severity (Emergency..Debug)
//! - `ReportError`: Internal error type for the send pipeline

pub mod error;
pub mod event;
pub mod message;
pub mod metadata;
pub mod severity;

pub use error::ReportError;
pub use event::ExceptionEvent;
pub use message::LogMessage;
pub use metadata::{FieldValue, Metadata};
pub use severity::Severity;
