//! Exception and message reporting to a Graylog server.
//!
//! `EventForwarder` decides whether an event is reported at all, derives its
//! severity, enriches it with identity and request metadata, and pushes it
//! through the GELF encoder and a [`Transport`]. Reporting is fire-and-forget:
//! no error ever reaches the caller.

pub mod context;
pub mod enrichment;
pub mod interpolate;

pub use context::{
    Account, IdentityLookup, Person, PersonResolver, ReportContext, RequestInfo, RequestLookup,
};
pub use enrichment::severity_for_status;

use crate::domain::{ExceptionEvent, LogMessage, Metadata, ReportError, Severity};
use crate::gelf::{ChunkSize, Compression, GelfEncoder};
use crate::transport::{DEFAULT_PORT, Transport, TransportConfig, UdpTransport};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Runtime settings of the forwarder, resolved once from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwarderSettings {
    /// Graylog host. `None` or empty disables forwarding.
    pub host: Option<String>,
    pub port: u16,
    pub chunk_size: ChunkSize,
    pub compression: Compression,
    pub skip_status_codes: BTreeSet<u16>,
    /// Value of the GELF `host` field; defaults to the machine hostname.
    pub source_host: Option<String>,
    pub send_timeout: Duration,
}

impl Default for ForwarderSettings {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_PORT,
            chunk_size: ChunkSize::Wan,
            compression: Compression::Zlib,
            skip_status_codes: BTreeSet::new(),
            source_host: None,
            send_timeout: UdpTransport::DEFAULT_SEND_TIMEOUT,
        }
    }
}

impl ForwarderSettings {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: ChunkSize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_skip_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.skip_status_codes = codes.into_iter().collect();
        self
    }

    pub fn with_source_host(mut self, source_host: impl Into<String>) -> Self {
        self.source_host = Some(source_host.into());
        self
    }

    /// Destination for the next message, or `None` when forwarding is off.
    pub fn transport_config(&self) -> Option<TransportConfig> {
        let host = self.host.as_deref().map(str::trim).filter(|h| !h.is_empty())?;
        Some(TransportConfig::new(host, self.port, self.chunk_size))
    }
}

pub struct EventForwarder<T: Transport = UdpTransport> {
    settings: ForwarderSettings,
    encoder: GelfEncoder,
    transport: T,
    persons: Option<Arc<dyn PersonResolver>>,
}

impl EventForwarder<UdpTransport> {
    pub fn new(settings: ForwarderSettings) -> Self {
        let transport = UdpTransport::new(settings.send_timeout);
        Self::with_transport(settings, transport)
    }
}

impl<T: Transport> EventForwarder<T> {
    pub fn with_transport(settings: ForwarderSettings, transport: T) -> Self {
        let mut encoder = GelfEncoder::new(settings.chunk_size, settings.compression);
        if let Some(source_host) = settings.source_host.as_deref().filter(|h| !h.is_empty()) {
            encoder = encoder.with_source_host(source_host);
        }

        Self {
            settings,
            encoder,
            transport,
            persons: None,
        }
    }

    /// Register the optional person lookup used for `authenticated_person`.
    pub fn with_person_resolver(mut self, persons: Arc<dyn PersonResolver>) -> Self {
        self.persons = Some(persons);
        self
    }

    pub fn settings(&self) -> &ForwarderSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.transport_config().is_some()
    }

    pub fn is_skipped(&self, status_code: Option<u16>) -> bool {
        status_code.is_some_and(|code| self.settings.skip_status_codes.contains(&code))
    }

    /// Metadata for an exception report: exception fields first, then the
    /// identity, then the request. Earlier keys are never replaced.
    pub fn exception_metadata(&self, event: &ExceptionEvent, ctx: &ReportContext<'_>) -> Metadata {
        let mut metadata = enrichment::exception_metadata(event);

        if let Some(account) = ctx.identity.and_then(|identity| identity.current_account()) {
            metadata.merge_absent(enrichment::identity_metadata(
                &account,
                self.persons.as_deref(),
            ));
        }

        if let Some(request) = ctx.request.and_then(|request| request.current_request()) {
            metadata.merge_absent(enrichment::request_metadata(&request));
        }

        metadata
    }

    /// Report a caught error. Never fails.
    pub async fn report_exception(&self, event: &ExceptionEvent, ctx: &ReportContext<'_>) {
        self.report_exception_with(event, ctx, Metadata::new()).await;
    }

    /// [`EventForwarder::report_exception`] with caller fields appended after
    /// the exception, identity and request keys. Caller fields never replace
    /// those keys.
    pub async fn report_exception_with(
        &self,
        event: &ExceptionEvent,
        ctx: &ReportContext<'_>,
        extra: Metadata,
    ) {
        if self.is_skipped(event.status_code) {
            debug!(
                "Skipping exception report for status code {:?}",
                event.status_code
            );
            return;
        }

        let severity = severity_for_status(event.status_code);
        let mut metadata = self.exception_metadata(event, ctx);
        metadata.merge_absent(extra);

        self.send(
            &event.message,
            Some(event.representation()),
            metadata,
            severity,
        )
        .await;
    }

    /// Send a message with caller-supplied metadata as-is. Never fails.
    pub async fn report_message(&self, raw_message: &str, metadata: Metadata, severity: Severity) {
        self.send(raw_message, None, metadata, severity).await;
    }

    /// [`EventForwarder::report_message`] at `Info`.
    pub async fn report_info(&self, raw_message: &str, metadata: Metadata) {
        self.report_message(raw_message, metadata, Severity::Info).await;
    }

    async fn send(
        &self,
        raw_message: &str,
        full_message: Option<&str>,
        metadata: Metadata,
        severity: Severity,
    ) {
        let Some(destination) = self.settings.transport_config() else {
            trace!("Graylog host not configured, dropping message");
            return;
        };

        let mut short_message = interpolate::interpolate(raw_message, &metadata);
        if short_message.trim().is_empty() {
            short_message = fallback_short_message(full_message);
            debug!("Empty short message replaced with '{}'", short_message);
        }
        let mut message = LogMessage::new(short_message, severity, metadata);
        if let Some(full_message) = full_message {
            message = message.with_full_message(full_message);
        }

        if let Err(e) = self.try_send(&message, &destination).await {
            match e {
                ReportError::Encode(e) => warn!("Failed to encode GELF message: {}", e),
                ReportError::Transport(e) => {
                    debug!("Failed to send GELF message to {}: {}", destination, e);
                }
            }
        }
    }

    async fn try_send(
        &self,
        message: &LogMessage,
        destination: &TransportConfig,
    ) -> Result<(), ReportError> {
        let chunks = self.encoder.encode(message)?;
        self.transport.send(&chunks, destination).await?;
        trace!(
            "Reported '{}' at level {} in {} datagram(s)",
            message.short_message,
            message.severity,
            chunks.len()
        );
        Ok(())
    }
}

const EMPTY_SHORT_MESSAGE: &str = "-";

/// GELF rejects a blank `short_message`. Use the first non-blank line of the
/// full message, or `-`.
fn fallback_short_message(full_message: Option<&str>) -> String {
    full_message
        .and_then(|full| full.lines().map(str::trim).find(|line| !line.is_empty()))
        .unwrap_or(EMPTY_SHORT_MESSAGE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldValue;
    use crate::transport::{MemoryTransport, MockTransport, TransportError};

    fn forwarder(settings: ForwarderSettings) -> (EventForwarder<MemoryTransport>, MemoryTransport) {
        let transport = MemoryTransport::new();
        (
            EventForwarder::with_transport(settings, transport.clone()),
            transport,
        )
    }

    #[test]
    fn test_disabled_without_host() {
        let (forwarder, transport) = forwarder(ForwarderSettings::default());
        assert!(!forwarder.is_enabled());

        tokio_test::block_on(forwarder.report_info("x", Metadata::new()));
        assert_eq!(transport.send_count(), 0);
    }

    #[test]
    fn test_blank_host_disables_forwarding() {
        let (forwarder, transport) = forwarder(ForwarderSettings::default().with_host("  "));
        assert!(!forwarder.is_enabled());

        tokio_test::block_on(forwarder.report_exception(
            &ExceptionEvent::new("boom").with_status_code(500),
            &ReportContext::empty(),
        ));
        assert_eq!(transport.send_count(), 0);
    }

    #[test]
    fn test_transport_failure_is_swallowed() {
        let (forwarder, transport) =
            forwarder(ForwarderSettings::default().with_host("graylog.local"));
        transport.fail_sends(true);

        tokio_test::block_on(forwarder.report_info("x", Metadata::new()));
        assert_eq!(transport.send_count(), 0);
    }

    #[test]
    fn test_destination_uses_settings() {
        let settings = ForwarderSettings::default()
            .with_host("graylog.local")
            .with_port(12202)
            .with_chunk_size(ChunkSize::Lan);
        let (forwarder, transport) = forwarder(settings);

        tokio_test::block_on(forwarder.report_info("hello", Metadata::new()));

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].destination.host, "graylog.local");
        assert_eq!(sent[0].destination.port, 12202);
        assert_eq!(sent[0].destination.chunk_size, ChunkSize::Lan);
    }

    #[test]
    fn test_skip_list_only_matches_present_codes() {
        let (forwarder, _) = forwarder(
            ForwarderSettings::default()
                .with_host("graylog.local")
                .with_skip_status_codes([404, 403]),
        );

        assert!(forwarder.is_skipped(Some(404)));
        assert!(!forwarder.is_skipped(Some(500)));
        assert!(!forwarder.is_skipped(None));
    }

    #[test]
    fn test_exception_metadata_without_context() {
        let (forwarder, _) = forwarder(ForwarderSettings::default());
        let event = ExceptionEvent::new("boom")
            .with_status_code(500)
            .with_code("1700000000")
            .with_location("src/lib.rs", 12)
            .with_reference_code("20240101-abc");

        let metadata = forwarder.exception_metadata(&event, &ReportContext::empty());

        let keys: Vec<&str> = metadata.keys().collect();
        assert_eq!(
            keys,
            vec![
                "exception",
                "reference_code",
                "response_status_code",
                "response_status_message",
                "code",
                "file",
                "line"
            ]
        );
        assert_eq!(metadata.get("response_status_code"), Some(&FieldValue::Int(500)));
    }

    #[test]
    fn test_skipped_exception_never_reaches_transport() {
        let mut transport = MockTransport::new();
        transport.expect_send().never();

        let settings = ForwarderSettings::default()
            .with_host("graylog.local")
            .with_skip_status_codes([404]);
        let forwarder = EventForwarder::with_transport(settings, transport);

        tokio_test::block_on(forwarder.report_exception(
            &ExceptionEvent::new("missing").with_status_code(404),
            &ReportContext::empty(),
        ));
    }

    #[test]
    fn test_each_report_is_one_transport_call() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|chunks, destination| {
                chunks.len() == 1
                    && destination.host == "graylog.local"
                    && destination.port == 12201
            })
            .times(2)
            .returning(|_, _| Box::pin(std::future::ready(Ok(()))));

        let forwarder = EventForwarder::with_transport(
            ForwarderSettings::default().with_host("graylog.local"),
            transport,
        );

        tokio_test::block_on(async {
            forwarder
                .report_exception(
                    &ExceptionEvent::new("boom").with_status_code(500),
                    &ReportContext::empty(),
                )
                .await;
            forwarder.report_info("hello", Metadata::new()).await;
        });
    }

    #[test]
    fn test_transport_timeout_is_swallowed() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(1).returning(|_, _| {
            Box::pin(std::future::ready(Err(TransportError::Timeout(
                "sending to graylog.local:12201".to_string(),
            ))))
        });

        let forwarder = EventForwarder::with_transport(
            ForwarderSettings::default().with_host("graylog.local"),
            transport,
        );

        tokio_test::block_on(forwarder.report_info("hello", Metadata::new()));
    }

    #[test]
    fn test_fallback_short_message() {
        assert_eq!(
            fallback_short_message(Some("\n  Boom: disk full\nat main.rs:3")),
            "Boom: disk full"
        );
        assert_eq!(fallback_short_message(Some("  ")), "-");
        assert_eq!(fallback_short_message(None), "-");
    }
}
