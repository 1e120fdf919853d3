use crate::gelf::EncodeError;
use crate::transport::TransportError;
use thiserror::Error;

/// Error raised inside the send pipeline.
///
/// Never returned from the public reporting API: the forwarder logs it and
/// drops it.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}
