pub mod config;
pub mod logging_system;

pub use config::{Config, ConfigError, LogFormat, LogLevel};
pub use logging_system::{LoggingError, LoggingSystem, setup_logging};

use crate::domain::{ExceptionEvent, FieldValue, Metadata, Severity};
use crate::forwarder::{EventForwarder, ReportContext};
use crate::transport::Transport;
use clap::Parser;
use tracing::{info, warn};

/// Send a single GELF message to a Graylog server.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    /// Message text; `{key}` placeholders are filled from --field values
    pub message: String,

    /// Syslog severity, by name or number
    #[arg(long, default_value = "info")]
    pub level: Severity,

    /// Additional field as key=value (repeatable)
    #[arg(short = 'f', long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, FieldValue)>,

    /// Report as an exception carrying this HTTP status instead of a plain message.
    /// --field values are attached after the exception fields.
    #[arg(long)]
    pub status_code: Option<u16>,
}

/// Parse `key=value`, typing the value as bool, integer, float or string.
pub fn parse_field(raw: &str) -> Result<(String, FieldValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty field name in '{raw}'"));
    }

    let value = if let Ok(b) = value.parse::<bool>() {
        FieldValue::Bool(b)
    } else if let Ok(i) = value.parse::<i64>() {
        FieldValue::Int(i)
    } else if let Ok(f) = value.parse::<f64>() {
        FieldValue::Float(f)
    } else {
        FieldValue::String(value.to_string())
    };

    Ok((key.to_string(), value))
}

pub struct App {
    cli: Cli,
}

impl App {
    pub fn from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self {
            cli: Cli::try_parse_from(args)?,
        })
    }

    pub fn cli(&self) -> &Cli {
        &self.cli
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let config = self.cli.config.clone().resolve()?;
        setup_logging(config.log_level, config.log_format)?;

        let forwarder = EventForwarder::new(config.forwarder_settings());
        if !forwarder.is_enabled() {
            warn!("No Graylog host configured, nothing will be sent");
        }

        self.report(&forwarder).await;

        info!(
            "Message handed to {}:{} (chunk size {} bytes)",
            config.host.as_deref().unwrap_or("<disabled>"),
            config.port,
            config.chunk_size().bytes()
        );
        Ok(())
    }

    /// Hand the parsed message and its `--field` values to `forwarder`.
    ///
    /// With `--status-code` the fields follow the exception metadata and never
    /// replace its keys.
    pub async fn report<T: Transport>(&self, forwarder: &EventForwarder<T>) {
        let metadata: Metadata = self.cli.fields.iter().cloned().collect();

        match self.cli.status_code {
            Some(status_code) => {
                let event =
                    ExceptionEvent::new(self.cli.message.as_str()).with_status_code(status_code);
                forwarder
                    .report_exception_with(&event, &ReportContext::empty(), metadata)
                    .await;
            }
            None => {
                forwarder
                    .report_message(&self.cli.message, metadata, self.cli.level)
                    .await;
            }
        }
    }
}

pub async fn main() -> anyhow::Result<()> {
    let app = match App::from_args(std::env::args_os()) {
        Ok(app) => app,
        Err(e) => e.exit(),
    };
    app.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gelf::ReceivedMessage;
    use crate::transport::MemoryTransport;

    #[test]
    fn test_parse_field_types() {
        assert_eq!(
            parse_field("retries=3").unwrap(),
            ("retries".to_string(), FieldValue::Int(3))
        );
        assert_eq!(
            parse_field("ratio=0.5").unwrap(),
            ("ratio".to_string(), FieldValue::Float(0.5))
        );
        assert_eq!(
            parse_field("cached=true").unwrap(),
            ("cached".to_string(), FieldValue::Bool(true))
        );
        assert_eq!(
            parse_field("path=/a=b").unwrap(),
            ("path".to_string(), FieldValue::from("/a=b"))
        );
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=x").is_err());
    }

    #[test]
    fn test_fields_are_kept_when_reporting_an_exception() {
        let app = App::from_args([
            "graylog-reporter",
            "--host",
            "graylog.local",
            "--compression",
            "none",
            "--status-code",
            "500",
            "-f",
            "user=alice",
            "-f",
            "exception=replaced",
            "checkout failed",
        ])
        .unwrap();
        let transport = MemoryTransport::new();
        let forwarder =
            EventForwarder::with_transport(app.cli().config.forwarder_settings(), transport.clone());

        tokio_test::block_on(app.report(&forwarder));

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        let message = ReceivedMessage::from_payload(&sent[0].chunks[0]).unwrap();
        let metadata = message.metadata();
        assert_eq!(message.level, Some(3));
        assert_eq!(metadata.get("user"), Some(&FieldValue::from("alice")));
        assert_eq!(
            metadata.get("exception"),
            Some(&FieldValue::from("checkout failed"))
        );
        assert_eq!(
            metadata.get("response_status_message"),
            Some(&FieldValue::from("500 Internal Server Error"))
        );
    }

    #[test]
    fn test_cli_parses_config_and_message() {
        let app = App::from_args([
            "graylog-reporter",
            "--host",
            "graylog.local",
            "--chunksize",
            "LAN",
            "--skip-status-codes",
            "404,403",
            "--level",
            "warning",
            "-f",
            "user=alice",
            "disk full on {user}",
        ])
        .unwrap();

        let cli = app.cli();
        assert_eq!(cli.config.host.as_deref(), Some("graylog.local"));
        assert_eq!(cli.config.chunk_size().bytes(), 8154);
        assert_eq!(cli.config.skip_status_codes, vec![404, 403]);
        assert_eq!(cli.level, Severity::Warning);
        assert_eq!(cli.fields.len(), 1);
        assert_eq!(cli.message, "disk full on {user}");
    }

    #[test]
    fn test_unknown_level_is_rejected() {
        let error = App::from_args(["graylog-reporter", "--level", "loud", "x"])
            .err()
            .unwrap();
        assert!(error.to_string().contains("Unknown syslog severity 'loud'"));
    }
}
