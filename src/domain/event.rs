use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt::Write;

/// An error captured at the call site, ready to be reported.
///
/// Built once where the error was caught and consumed by a single
/// `EventForwarder::report_exception` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExceptionEvent {
    pub message: String,
    /// Full textual form of the error (type, message and cause chain).
    pub representation: Option<String>,
    pub code: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub reference_code: Option<String>,
    /// HTTP status the failing request resolved to, if the error carries one.
    pub status_code: Option<u16>,
}

impl ExceptionEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Capture an error value: `Display` becomes the message and the
    /// `source()` chain becomes the full representation.
    pub fn from_error<E: StdError + ?Sized>(error: &E) -> Self {
        let message = error.to_string();
        let mut representation = format!("{error:?}");
        let mut source = error.source();
        while let Some(cause) = source {
            let _ = write!(representation, "\nCaused by: {cause}");
            source = cause.source();
        }

        Self {
            message,
            representation: Some(representation),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = Some(file.into());
        self.line = Some(line);
        self
    }

    pub fn with_reference_code(mut self, reference_code: impl Into<String>) -> Self {
        self.reference_code = Some(reference_code.into());
        self
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_representation(mut self, representation: impl Into<String>) -> Self {
        self.representation = Some(representation.into());
        self
    }

    /// The full representation, falling back to the message.
    pub fn representation(&self) -> &str {
        self.representation.as_deref().unwrap_or(&self.message)
    }
}

/// Build an event carrying the caller's file and line.
#[macro_export]
macro_rules! exception_event {
    ($($arg:tt)+) => {
        $crate::domain::ExceptionEvent::new(format!($($arg)+)).with_location(file!(), line!())
    };
}
