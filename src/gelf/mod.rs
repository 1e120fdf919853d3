//! GELF 1.1 wire format: JSON document, optional compression and UDP chunking.

pub mod chunk;
pub mod encoder;

pub use chunk::{ChunkAssembler, ReceivedMessage, chunk_payload, decode_payload};
pub use encoder::{GelfEncoder, default_source_host};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const GELF_VERSION: &str = "1.1";

/// Magic bytes opening every chunked datagram.
pub const CHUNK_MAGIC: [u8; 2] = [0x1e, 0x0f];
/// magic (2) + message id (8) + sequence (1) + total (1)
pub const CHUNK_HEADER_LEN: usize = 12;
pub const MAX_CHUNKS: usize = 128;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("JSON serialization failed: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("IO error during compression: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Message needs {chunks} chunks, GELF allows at most {max}")]
    TooManyChunks { chunks: usize, max: usize },
    #[error("Malformed chunk: {0}")]
    MalformedChunk(String),
    #[error("Payload is not a GELF JSON object")]
    NotAnObject,
}

/// Datagram payload size presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkSize {
    #[default]
    Wan,
    Lan,
    Custom(usize),
}

impl ChunkSize {
    pub const WAN_BYTES: usize = 1420;
    pub const LAN_BYTES: usize = 8154;

    /// `"lan"` in any case selects the LAN preset, anything else is WAN.
    pub fn resolve(setting: Option<&str>) -> Self {
        match setting {
            Some(value) if value.trim().eq_ignore_ascii_case("lan") => ChunkSize::Lan,
            _ => ChunkSize::Wan,
        }
    }

    pub fn bytes(&self) -> usize {
        match self {
            ChunkSize::Wan => Self::WAN_BYTES,
            ChunkSize::Lan => Self::LAN_BYTES,
            ChunkSize::Custom(bytes) => (*bytes).max(1),
        }
    }
}

/// Payload compression applied before chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    /// zlib stream, what most GELF UDP clients send by default
    #[default]
    Zlib,
    Gzip,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_size_resolution_is_case_insensitive() {
        assert_eq!(ChunkSize::resolve(Some("LAN")), ChunkSize::Lan);
        assert_eq!(ChunkSize::resolve(Some("lan")), ChunkSize::Lan);
        assert_eq!(ChunkSize::resolve(Some("wan")), ChunkSize::Wan);
        assert_eq!(ChunkSize::resolve(Some("jumbo")), ChunkSize::Wan);
        assert_eq!(ChunkSize::resolve(None), ChunkSize::Wan);
    }

    #[test]
    fn test_chunk_size_presets() {
        assert_eq!(ChunkSize::Wan.bytes(), 1420);
        assert_eq!(ChunkSize::Lan.bytes(), 8154);
        assert_eq!(ChunkSize::Custom(0).bytes(), 1);
    }
}
