use super::chunk::chunk_payload;
use super::{ChunkSize, Compression, EncodeError, GELF_VERSION};
use crate::domain::LogMessage;
use bytes::Bytes;
use flate2::write::{GzEncoder, ZlibEncoder};
use regex::Regex;
use serde_json::{Map, Value};
use std::io::Write;
use std::sync::OnceLock;
use tracing::debug;

static INVALID_KEY_CHARS: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

/// Replace every character GELF does not allow in field names with `_`.
fn sanitize_key(key: &str) -> String {
    match INVALID_KEY_CHARS.get_or_init(|| Regex::new(r"[^\w.\-]")) {
        Ok(pattern) => pattern.replace_all(key, "_").into_owned(),
        Err(_) => key
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || matches!(c, '_' | '.' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect(),
    }
}

/// Hostname reported in the GELF `host` field when none is configured.
pub fn default_source_host() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Turns a [`LogMessage`] into the datagrams of one GELF message.
#[derive(Debug, Clone)]
pub struct GelfEncoder {
    chunk_size: ChunkSize,
    compression: Compression,
    source_host: String,
}

impl GelfEncoder {
    pub fn new(chunk_size: ChunkSize, compression: Compression) -> Self {
        Self {
            chunk_size,
            compression,
            source_host: default_source_host(),
        }
    }

    pub fn with_source_host(mut self, source_host: impl Into<String>) -> Self {
        self.source_host = source_host.into();
        self
    }

    pub fn chunk_size(&self) -> ChunkSize {
        self.chunk_size
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn source_host(&self) -> &str {
        &self.source_host
    }

    /// Build the GELF JSON document.
    ///
    /// Every metadata entry becomes an `_`-prefixed field, nulls and empty
    /// strings included, so a receiver sees the full envelope. Keys are
    /// sanitized and the reserved `id` field is dropped.
    pub fn to_document(&self, message: &LogMessage) -> Value {
        let mut document = Map::with_capacity(6 + message.metadata.len());
        document.insert("version".to_string(), Value::from(GELF_VERSION));
        document.insert("host".to_string(), Value::from(self.source_host.as_str()));
        document.insert(
            "short_message".to_string(),
            Value::from(message.short_message.as_str()),
        );
        if let Some(full_message) = message.full_message.as_deref().filter(|m| !m.is_empty()) {
            document.insert("full_message".to_string(), Value::from(full_message));
        }
        document.insert(
            "timestamp".to_string(),
            Value::from(message.timestamp.timestamp_millis() as f64 / 1000.0),
        );
        document.insert("level".to_string(), Value::from(u8::from(message.severity)));

        for (key, value) in message.metadata.iter() {
            let key = sanitize_key(key);
            if key == "id" {
                debug!("Dropping reserved GELF field '_id'");
                continue;
            }
            document.insert(format!("_{key}"), value.to_json());
        }

        Value::Object(document)
    }

    /// Serialize and compress without chunking.
    pub fn serialize(&self, message: &LogMessage) -> Result<Vec<u8>, EncodeError> {
        let json = serde_json::to_vec(&self.to_document(message))?;

        let payload = match self.compression {
            Compression::None => json,
            Compression::Zlib => {
                let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&json)?;
                encoder.finish()?
            }
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&json)?;
                encoder.finish()?
            }
        };

        Ok(payload)
    }

    /// Encode a message into one or more datagrams ready for the transport.
    pub fn encode(&self, message: &LogMessage) -> Result<Vec<Bytes>, EncodeError> {
        let payload = self.serialize(message)?;
        let chunks = chunk_payload(&payload, self.chunk_size.bytes(), rand::random())?;

        if chunks.len() > 1 {
            debug!(
                "GELF payload of {} bytes split into {} chunks",
                payload.len(),
                chunks.len()
            );
        }

        Ok(chunks)
    }
}

impl Default for GelfEncoder {
    fn default() -> Self {
        Self::new(ChunkSize::default(), Compression::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Metadata, Severity};
    use crate::gelf::chunk::ReceivedMessage;
    use chrono::{TimeZone, Utc};

    fn sample_message() -> LogMessage {
        let metadata = Metadata::new()
            .with("file", "src/main.rs")
            .with("line", 42u32)
            .with("reference_code", None::<String>)
            .with("empty", "")
            .with("bad key!", "x")
            .with("id", "reserved");

        LogMessage::new("Something failed", Severity::Warning, metadata)
            .with_full_message("Something failed\nCaused by: io")
            .with_timestamp(Utc.timestamp_millis_opt(1_700_000_000_123).unwrap())
    }

    #[test]
    fn test_document_fields() {
        let encoder = GelfEncoder::default().with_source_host("web-1");
        let document = encoder.to_document(&sample_message());

        assert_eq!(document["version"], "1.1");
        assert_eq!(document["host"], "web-1");
        assert_eq!(document["short_message"], "Something failed");
        assert_eq!(document["full_message"], "Something failed\nCaused by: io");
        assert_eq!(document["level"], 4);
        assert_eq!(document["timestamp"], 1_700_000_000.123);
        assert_eq!(document["_file"], "src/main.rs");
        assert_eq!(document["_line"], 42);
        assert_eq!(document["_bad_key_"], "x");
    }

    #[test]
    fn test_document_keeps_null_and_empty_but_drops_id() {
        let encoder = GelfEncoder::default().with_source_host("web-1");
        let document = encoder.to_document(&sample_message());
        let object = document.as_object().unwrap();

        assert_eq!(object.get("_reference_code"), Some(&Value::Null));
        assert_eq!(object.get("_empty"), Some(&Value::from("")));
        assert!(!object.contains_key("_id"));
    }

    #[test]
    fn test_each_compression_decodes() {
        for compression in [Compression::None, Compression::Zlib, Compression::Gzip] {
            let encoder =
                GelfEncoder::new(ChunkSize::Lan, compression).with_source_host("web-1");
            let payload = encoder.serialize(&sample_message()).unwrap();
            let received = ReceivedMessage::from_payload(&payload).unwrap();

            assert_eq!(received.short_message, "Something failed");
            assert_eq!(received.level, Some(4));
            assert_eq!(received.host, "web-1");
        }
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("request.uri-path_1"), "request.uri-path_1");
        assert_eq!(sanitize_key("a b/c"), "a_b_c");
    }
}
