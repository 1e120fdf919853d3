use crate::domain::Metadata;
use regex::{Captures, Regex};
use std::sync::OnceLock;

static PLACEHOLDER: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

/// Replace `{key}` placeholders with the matching metadata value.
///
/// Placeholders without a matching key are left as written.
pub fn interpolate(message: &str, metadata: &Metadata) -> String {
    if metadata.is_empty() || !message.contains('{') {
        return message.to_string();
    }

    let Ok(pattern) = PLACEHOLDER.get_or_init(|| Regex::new(r"\{([\w.\-]+)\}")) else {
        return message.to_string();
    };

    pattern
        .replace_all(message, |caps: &Captures<'_>| match metadata.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_known_placeholders() {
        let metadata = Metadata::new().with("user", "alice").with("count", 3i64);
        assert_eq!(
            interpolate("{user} failed {count} times", &metadata),
            "alice failed 3 times"
        );
    }

    #[test]
    fn test_keeps_unknown_placeholders() {
        let metadata = Metadata::new().with("user", "alice");
        assert_eq!(interpolate("{user} hit {limit}", &metadata), "alice hit {limit}");
        assert_eq!(interpolate("plain {x}", &Metadata::new()), "plain {x}");
    }

    #[test]
    fn test_null_value_renders_empty() {
        let metadata = Metadata::new().with("ref", None::<String>);
        assert_eq!(interpolate("ref=[{ref}]", &metadata), "ref=[]");
    }
}
