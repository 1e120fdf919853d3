use super::{Transport, TransportConfig, TransportError};
use bytes::Bytes;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{UdpSocket, lookup_host};
use tokio::time::timeout;
use tracing::trace;

/// UDP transport opening a fresh socket for every message.
///
/// The socket lives only for the duration of one `send` call and is closed
/// on every exit path when it goes out of scope.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    send_timeout: Duration,
}

impl UdpTransport {
    pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(1);

    pub fn new(send_timeout: Duration) -> Self {
        Self { send_timeout }
    }

    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    async fn resolve(&self, destination: &TransportConfig) -> Result<SocketAddr, TransportError> {
        let mut addrs = timeout(
            self.send_timeout,
            lookup_host((destination.host.as_str(), destination.port)),
        )
        .await
        .map_err(|_| TransportError::Timeout(format!("resolving {destination}")))?
        .map_err(|e| TransportError::ResolveFailed(format!("{destination}: {e}")))?;

        addrs
            .next()
            .ok_or_else(|| TransportError::ResolveFailed(destination.to_string()))
    }
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEND_TIMEOUT)
    }
}

impl Transport for UdpTransport {
    async fn send(
        &self,
        chunks: &[Bytes],
        destination: &TransportConfig,
    ) -> Result<(), TransportError> {
        let target = self.resolve(destination).await?;

        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(target).await?;

        for chunk in chunks {
            timeout(self.send_timeout, socket.send(chunk))
                .await
                .map_err(|_| TransportError::Timeout(format!("sending to {target}")))??;
        }

        trace!("Sent {} datagram(s) to {}", chunks.len(), target);
        Ok(())
    }
}
