use super::{CHUNK_HEADER_LEN, CHUNK_MAGIC, EncodeError, MAX_CHUNKS};
use crate::domain::{FieldValue, Metadata};
use bytes::{BufMut, Bytes, BytesMut};
use flate2::read::{GzDecoder, ZlibDecoder};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::time::{Duration, Instant};
use tracing::debug;

/// Split an encoded payload into GELF datagrams.
///
/// A payload that fits in `chunk_size` bytes is sent as-is. Larger payloads
/// are cut into `chunk_size` pieces, each prefixed with the 12 byte chunk
/// header sharing `message_id`.
pub fn chunk_payload(
    payload: &[u8],
    chunk_size: usize,
    message_id: [u8; 8],
) -> Result<Vec<Bytes>, EncodeError> {
    let chunk_size = chunk_size.max(1);
    if payload.len() <= chunk_size {
        return Ok(vec![Bytes::copy_from_slice(payload)]);
    }

    let total = payload.len().div_ceil(chunk_size);
    if total > MAX_CHUNKS {
        return Err(EncodeError::TooManyChunks {
            chunks: total,
            max: MAX_CHUNKS,
        });
    }

    let mut chunks = Vec::with_capacity(total);
    for (sequence, piece) in payload.chunks(chunk_size).enumerate() {
        let mut datagram = BytesMut::with_capacity(CHUNK_HEADER_LEN + piece.len());
        datagram.put_slice(&CHUNK_MAGIC);
        datagram.put_slice(&message_id);
        datagram.put_u8(sequence as u8);
        datagram.put_u8(total as u8);
        datagram.put_slice(piece);
        chunks.push(datagram.freeze());
    }

    Ok(chunks)
}

#[derive(Debug)]
struct PendingMessage {
    total: u8,
    parts: Vec<Option<Bytes>>,
    received: usize,
    first_seen: Instant,
}

/// Receiver-side reassembly of chunked GELF datagrams.
///
/// Chunks may arrive in any order and interleaved with other messages.
/// Duplicate chunks are ignored. A message whose chunks do not all arrive
/// within `max_age` of its first chunk is discarded.
#[derive(Debug)]
pub struct ChunkAssembler {
    pending: HashMap<[u8; 8], PendingMessage>,
    max_age: Duration,
}

impl ChunkAssembler {
    /// Graylog's own reassembly window.
    pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(5);

    pub fn new() -> Self {
        Self::with_max_age(Self::DEFAULT_MAX_AGE)
    }

    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            max_age,
        }
    }

    /// Drop incomplete messages older than `max_age`. Returns how many were dropped.
    pub fn evict_expired(&mut self) -> usize {
        let before = self.pending.len();
        let max_age = self.max_age;
        self.pending.retain(|_, message| message.first_seen.elapsed() < max_age);

        let evicted = before - self.pending.len();
        if evicted > 0 {
            debug!("Discarded {} incomplete GELF message(s)", evicted);
        }
        evicted
    }

    /// Feed one datagram. Returns the full payload once every chunk of its
    /// message has been seen; unchunked datagrams are returned immediately.
    pub fn push(&mut self, datagram: &[u8]) -> Result<Option<Vec<u8>>, EncodeError> {
        if !datagram.starts_with(&CHUNK_MAGIC) {
            return Ok(Some(datagram.to_vec()));
        }
        if datagram.len() < CHUNK_HEADER_LEN {
            return Err(EncodeError::MalformedChunk(format!(
                "datagram of {} bytes is shorter than the chunk header",
                datagram.len()
            )));
        }

        let mut message_id = [0u8; 8];
        message_id.copy_from_slice(&datagram[2..10]);
        let sequence = datagram[10];
        let total = datagram[11];

        if total == 0 || total as usize > MAX_CHUNKS || sequence >= total {
            return Err(EncodeError::MalformedChunk(format!(
                "sequence {sequence} of {total} is out of range"
            )));
        }

        self.evict_expired();

        let pending = self
            .pending
            .entry(message_id)
            .or_insert_with(|| PendingMessage {
                total,
                parts: vec![None; total as usize],
                received: 0,
                first_seen: Instant::now(),
            });

        if pending.total != total {
            return Err(EncodeError::MalformedChunk(format!(
                "chunk count changed from {} to {total}",
                pending.total
            )));
        }

        let slot = &mut pending.parts[sequence as usize];
        if slot.is_none() {
            *slot = Some(Bytes::copy_from_slice(&datagram[CHUNK_HEADER_LEN..]));
            pending.received += 1;
        }

        if pending.received < total as usize {
            return Ok(None);
        }

        let Some(complete) = self.pending.remove(&message_id) else {
            return Ok(None);
        };
        let payload = complete.parts.into_iter().flatten().fold(
            Vec::new(),
            |mut payload, part| {
                payload.extend_from_slice(&part);
                payload
            },
        );
        Ok(Some(payload))
    }

    /// Messages with at least one chunk still missing.
    pub fn pending_messages(&self) -> usize {
        self.pending.len()
    }
}

impl Default for ChunkAssembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a reassembled payload, detecting gzip, zlib or plain JSON.
pub fn decode_payload(payload: &[u8]) -> Result<serde_json::Value, EncodeError> {
    let json = match payload {
        [0x1f, 0x8b, ..] => {
            let mut buf = Vec::new();
            GzDecoder::new(payload).read_to_end(&mut buf)?;
            buf
        }
        [0x78, ..] => {
            let mut buf = Vec::new();
            ZlibDecoder::new(payload).read_to_end(&mut buf)?;
            buf
        }
        _ => payload.to_vec(),
    };

    let value: serde_json::Value = serde_json::from_slice(&json)?;
    if !value.is_object() {
        return Err(EncodeError::NotAnObject);
    }
    Ok(value)
}

/// A GELF message as seen by a receiver.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceivedMessage {
    pub version: String,
    pub host: String,
    pub short_message: String,
    pub full_message: Option<String>,
    pub timestamp: Option<f64>,
    pub level: Option<u8>,

    // Everything else
    #[serde(flatten)]
    pub additional: serde_json::Map<String, serde_json::Value>,
}

impl ReceivedMessage {
    pub fn from_payload(payload: &[u8]) -> Result<Self, EncodeError> {
        Ok(serde_json::from_value(decode_payload(payload)?)?)
    }

    /// Additional fields with their `_` prefix stripped, in wire order.
    pub fn metadata(&self) -> Metadata {
        self.additional
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix('_')
                    .map(|name| (name.to_string(), FieldValue::from_json(value)))
            })
            .collect()
    }
}
