use super::serde_helpers::{
    load_env_path_opt, load_env_status_codes, load_env_string, load_env_string_opt, load_env_var,
    parse_status_code, status_codes,
};
use super::{ConfigError, LogFormat, LogLevel};
use crate::forwarder::ForwarderSettings;
use crate::gelf::{ChunkSize, Compression};
use crate::transport::DEFAULT_PORT;
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Args, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Graylog server host; forwarding is disabled when unset or empty
    #[arg(long, env = "GRAYLOG_HOST")]
    pub host: Option<String>,

    /// Graylog GELF UDP input port
    #[arg(long, env = "GRAYLOG_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Chunk size preset: "lan" (8154 bytes) or anything else for wan (1420 bytes)
    #[arg(long, env = "GRAYLOG_CHUNKSIZE", default_value = "wan")]
    pub chunksize: String,

    /// HTTP status codes whose exceptions are never reported
    #[arg(
        long,
        env = "GRAYLOG_SKIP_STATUS_CODES",
        value_delimiter = ',',
        value_parser = parse_status_code
    )]
    #[serde(deserialize_with = "status_codes")]
    pub skip_status_codes: Vec<u16>,

    /// Payload compression
    #[arg(long, env = "GRAYLOG_COMPRESSION", default_value = "zlib")]
    pub compression: Compression,

    /// Value of the GELF host field (defaults to this machine's hostname)
    #[arg(long, env = "GRAYLOG_SOURCE_HOST")]
    pub source_host: Option<String>,

    /// Timeout for resolving the host and sending each datagram
    #[arg(long, env = "GRAYLOG_SEND_TIMEOUT_MS", default_value_t = 1000)]
    pub send_timeout_ms: u64,

    /// Local diagnostic log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Local diagnostic log format
    #[arg(long, env = "LOG_FORMAT", default_value = "compact")]
    pub log_format: LogFormat,

    /// Configuration file path (optional)
    #[arg(long, env = "GRAYLOG_CONFIG_FILE")]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: None,
            port: DEFAULT_PORT,
            chunksize: "wan".to_string(),
            skip_status_codes: Vec::new(),
            compression: Compression::Zlib,
            source_host: None,
            send_timeout_ms: 1000,
            log_level: LogLevel::Info,
            log_format: LogFormat::Compact,
            config_file: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        load_env_string_opt("GRAYLOG_HOST", &mut config.host);
        load_env_var("GRAYLOG_PORT", &mut config.port)?;
        load_env_string("GRAYLOG_CHUNKSIZE", &mut config.chunksize);
        load_env_status_codes("GRAYLOG_SKIP_STATUS_CODES", &mut config.skip_status_codes)?;

        // Compression requires special handling for case-insensitive parsing
        if let Ok(compression) = std::env::var("GRAYLOG_COMPRESSION") {
            config.compression = match compression.to_lowercase().as_str() {
                "none" => Compression::None,
                "zlib" => Compression::Zlib,
                "gzip" => Compression::Gzip,
                _ => {
                    return Err(ConfigError::EnvError(format!(
                        "Invalid GRAYLOG_COMPRESSION: {compression}. Valid values: none, zlib, gzip"
                    )));
                }
            };
        }

        load_env_string_opt("GRAYLOG_SOURCE_HOST", &mut config.source_host);
        load_env_var("GRAYLOG_SEND_TIMEOUT_MS", &mut config.send_timeout_ms)?;

        // LogLevel requires special handling for case-insensitive parsing
        if let Ok(log_level) = std::env::var("LOG_LEVEL") {
            config.log_level = match log_level.to_lowercase().as_str() {
                "error" => LogLevel::Error,
                "warn" => LogLevel::Warn,
                "info" => LogLevel::Info,
                "debug" => LogLevel::Debug,
                "trace" => LogLevel::Trace,
                _ => {
                    return Err(ConfigError::EnvError(format!(
                        "Invalid LOG_LEVEL: {log_level}"
                    )));
                }
            };
        }

        load_env_path_opt("GRAYLOG_CONFIG_FILE", &mut config.config_file);

        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configured file if one is set, otherwise validate `self`.
    pub fn resolve(self) -> Result<Self, ConfigError> {
        match &self.config_file {
            Some(path) => {
                let mut config = Self::from_file(path)?;
                config.config_file = Some(path.clone());
                Ok(config)
            }
            None => {
                self.validate()?;
                Ok(self)
            }
        }
    }

    pub fn chunk_size(&self) -> ChunkSize {
        ChunkSize::resolve(Some(&self.chunksize))
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn forwarder_settings(&self) -> ForwarderSettings {
        ForwarderSettings {
            host: self.host.clone(),
            port: self.port,
            chunk_size: self.chunk_size(),
            compression: self.compression,
            skip_status_codes: self.skip_status_codes.iter().copied().collect(),
            source_host: self.source_host.clone(),
            send_timeout: self.send_timeout(),
        }
    }
}
