use super::{Config, ConfigError};
use http::StatusCode;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "Port must be greater than 0".to_string(),
            ));
        }

        if self.send_timeout_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "Send timeout must be greater than 0".to_string(),
            ));
        }

        if let Some(code) = self
            .skip_status_codes
            .iter()
            .find(|code| StatusCode::from_u16(**code).is_err())
        {
            return Err(ConfigError::InvalidConfig(format!(
                "Skip status code {code} is not a valid HTTP status"
            )));
        }

        // An empty host is allowed and turns forwarding off; whitespace inside
        // a host is always a typo.
        if let Some(host) = self.host.as_deref().map(str::trim)
            && host.contains(char::is_whitespace)
        {
            return Err(ConfigError::InvalidConfig(format!(
                "Invalid host '{host}'"
            )));
        }

        Ok(())
    }
}
