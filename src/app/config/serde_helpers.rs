use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum StatusCodeRepr {
    Number(u64),
    Text(String),
}

/// Parse one skip-list entry written either as a number or a numeric string.
pub fn parse_status_code(value: &str) -> Result<u16, String> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|e| format!("invalid status code '{value}': {e}"))
}

/// Deserialize a list of status codes given as integers or numeric strings.
pub fn status_codes<'de, D>(deserializer: D) -> Result<Vec<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<StatusCodeRepr>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|entry| match entry {
            StatusCodeRepr::Number(n) => u16::try_from(n)
                .map_err(|_| serde::de::Error::custom(format!("status code {n} out of range"))),
            StatusCodeRepr::Text(s) => parse_status_code(&s).map_err(serde::de::Error::custom),
        })
        .collect()
}

/// Helper function to load and parse an environment variable.
/// Returns Ok(()) if the variable doesn't exist (keeps default).
pub fn load_env_var<T>(name: &str, target: &mut T) -> Result<(), super::ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if let Ok(value) = std::env::var(name) {
        *target = value
            .parse()
            .map_err(|e| super::ConfigError::EnvError(format!("Invalid {name}: {e}")))?;
    }
    Ok(())
}

/// Helper function to load an optional string environment variable.
pub fn load_env_string_opt(name: &str, target: &mut Option<String>) {
    if let Ok(value) = std::env::var(name) {
        *target = Some(value);
    }
}

/// Helper function to load a string environment variable.
pub fn load_env_string(name: &str, target: &mut String) {
    if let Ok(value) = std::env::var(name) {
        *target = value;
    }
}

/// Helper function to load a comma separated list of status codes.
pub fn load_env_status_codes(name: &str, target: &mut Vec<u16>) -> Result<(), super::ConfigError> {
    if let Ok(value) = std::env::var(name) {
        *target = value
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(parse_status_code)
            .collect::<Result<_, _>>()
            .map_err(|e| super::ConfigError::EnvError(format!("Invalid {name}: {e}")))?;
    }
    Ok(())
}

/// Helper function to load an optional PathBuf environment variable.
pub fn load_env_path_opt(name: &str, target: &mut Option<std::path::PathBuf>) {
    if let Ok(value) = std::env::var(name) {
        *target = Some(std::path::PathBuf::from(value));
    }
}
