//! Datagram delivery of encoded GELF chunks.

pub mod memory;
pub mod udp;

pub use memory::{MemoryTransport, SentMessage};
pub use udp::UdpTransport;

use crate::gelf::ChunkSize;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

pub const DEFAULT_PORT: u16 = 12201;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Could not resolve host: {0}")]
    ResolveFailed(String),
    #[error("Send timeout: {0}")]
    Timeout(String),
    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}

/// Where and how one message is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub host: String,
    pub port: u16,
    pub chunk_size: ChunkSize,
}

impl TransportConfig {
    pub fn new(host: impl Into<String>, port: u16, chunk_size: ChunkSize) -> Self {
        Self {
            host: host.into(),
            port,
            chunk_size,
        }
    }
}

impl fmt::Display for TransportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Sends the chunks of one message, each as an independent datagram.
///
/// Best effort: no acknowledgment, no retry, no ordering guarantee.
#[cfg_attr(test, automock)]
pub trait Transport: Send + Sync {
    fn send(
        &self,
        chunks: &[Bytes],
        destination: &TransportConfig,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;
}
