use super::{Transport, TransportConfig, TransportError};
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One recorded `send` call.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub destination: TransportConfig,
    pub chunks: Vec<Bytes>,
}

/// Transport that records messages instead of putting them on the network.
///
/// Clones share the same record, so a test can keep a handle while the
/// forwarder owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    fail: Arc<AtomicBool>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `send` fail with [`TransportError::Unavailable`].
    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

impl Transport for MemoryTransport {
    async fn send(
        &self,
        chunks: &[Bytes],
        destination: &TransportConfig,
    ) -> Result<(), TransportError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(TransportError::Unavailable(format!(
                "memory transport set to fail ({destination})"
            )));
        }

        self.sent.lock().push(SentMessage {
            destination: destination.clone(),
            chunks: chunks.to_vec(),
        });
        Ok(())
    }
}
