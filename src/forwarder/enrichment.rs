use super::context::{Account, PersonResolver, RequestInfo};
use crate::domain::{ExceptionEvent, Metadata, Severity};
use http::StatusCode;

pub const UNKNOWN_STATUS: &str = "Unknown Status";

/// Warning by default, Error when the request failed with exactly 500.
pub fn severity_for_status(status_code: Option<u16>) -> Severity {
    if status_code == Some(500) {
        Severity::Error
    } else {
        Severity::Warning
    }
}

pub fn reason_phrase(status_code: Option<u16>) -> &'static str {
    status_code
        .and_then(|code| StatusCode::from_u16(code).ok())
        .and_then(|status| status.canonical_reason())
        .unwrap_or(UNKNOWN_STATUS)
}

/// `"<code> <reason>"`; a missing code formats as `0`.
pub fn status_message(status_code: Option<u16>) -> String {
    format!(
        "{} {}",
        status_code.unwrap_or(0),
        reason_phrase(status_code)
    )
}

pub fn exception_metadata(event: &ExceptionEvent) -> Metadata {
    Metadata::new()
        .with("exception", event.representation())
        .with("reference_code", event.reference_code.clone())
        .with("response_status_code", event.status_code)
        .with("response_status_message", status_message(event.status_code))
        .with("code", event.code.clone())
        .with("file", event.file.clone())
        .with("line", event.line)
}

pub fn identity_metadata(account: &Account, persons: Option<&dyn PersonResolver>) -> Metadata {
    let mut metadata = Metadata::new()
        .with(
            "authenticated_account",
            format!("{} ({})", account.identifier, account.persisted_id),
        )
        .with("authenticated_roles", account.roles.join(", "));

    if let Some(person) = persons.and_then(|resolver| resolver.person_for(account)) {
        metadata.insert(
            "authenticated_person",
            format!("{} ({})", person.display_name, person.persisted_id),
        );
    }

    metadata
}

pub fn request_metadata(request: &RequestInfo) -> Metadata {
    Metadata::new()
        .with("request_domain", request.host.clone())
        .with("request_remote_addr", request.client_ip.clone())
        .with("request_path", request.relative_path.clone())
        .with("request_uri", request.uri_path.clone())
        .with("request_user_agent", request.user_agent.clone())
        .with("request_method", request.method.clone())
        .with("request_port", request.port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldValue;
    use crate::forwarder::context::Person;

    #[test]
    fn test_severity_derivation() {
        assert_eq!(severity_for_status(Some(500)), Severity::Error);
        assert_eq!(severity_for_status(Some(503)), Severity::Warning);
        assert_eq!(severity_for_status(Some(404)), Severity::Warning);
        assert_eq!(severity_for_status(None), Severity::Warning);
    }

    #[test]
    fn test_status_message() {
        assert_eq!(status_message(Some(500)), "500 Internal Server Error");
        assert_eq!(status_message(Some(404)), "404 Not Found");
        assert_eq!(status_message(Some(599)), "599 Unknown Status");
        assert_eq!(status_message(None), "0 Unknown Status");
    }

    #[test]
    fn test_identity_without_resolver_has_no_person() {
        let account = Account {
            identifier: "alice".to_string(),
            persisted_id: "a-1".to_string(),
            roles: vec!["Editor".to_string(), "Admin".to_string()],
        };

        let metadata = identity_metadata(&account, None);

        assert_eq!(
            metadata.get("authenticated_account"),
            Some(&FieldValue::from("alice (a-1)"))
        );
        assert_eq!(
            metadata.get("authenticated_roles"),
            Some(&FieldValue::from("Editor, Admin"))
        );
        assert!(!metadata.contains_key("authenticated_person"));
    }

    #[test]
    fn test_identity_with_resolver() {
        let account = Account {
            identifier: "alice".to_string(),
            persisted_id: "a-1".to_string(),
            roles: vec![],
        };
        let resolver = |_: &Account| {
            Some(Person {
                display_name: "Alice Doe".to_string(),
                persisted_id: "p-9".to_string(),
            })
        };

        let metadata = identity_metadata(&account, Some(&resolver));

        assert_eq!(
            metadata.get("authenticated_person"),
            Some(&FieldValue::from("Alice Doe (p-9)"))
        );
        assert_eq!(metadata.get("authenticated_roles"), Some(&FieldValue::from("")));
    }
}
