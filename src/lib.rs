#![deny(rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_lossless,            // Infallible casts are clear enough with `as`
    clippy::cast_possible_truncation, // Chunk counts are bounded by MAX_CHUNKS
    clippy::cast_precision_loss,      // Millisecond timestamps fit in f64
    clippy::missing_errors_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. TransportError in transport module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod domain;
pub mod forwarder;
pub mod gelf;
pub mod transport;

// Re-export main types for easy access
pub use domain::{ExceptionEvent, FieldValue, LogMessage, Metadata, Severity};
pub use forwarder::{EventForwarder, ForwarderSettings, ReportContext};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
