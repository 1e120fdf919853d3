//! Read-only lookups into the host application.
//!
//! The forwarder never reaches into global state: the application passes the
//! current identity and request in a [`ReportContext`] on every call, and an
//! optional [`PersonResolver`] once at construction.

use serde::{Deserialize, Serialize};

/// An authenticated account of the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Login identifier, e.g. the username.
    pub identifier: String,
    /// Identifier of the persisted account record.
    pub persisted_id: String,
    pub roles: Vec<String>,
}

/// A person record linked to an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub display_name: String,
    pub persisted_id: String,
}

/// Attributes of the HTTP request being handled when the error occurred.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo {
    /// Value of the `Host` header
    pub host: Option<String>,
    pub client_ip: Option<String>,
    /// Path relative to the application base URI
    pub relative_path: Option<String>,
    pub uri_path: Option<String>,
    pub user_agent: Option<String>,
    pub method: Option<String>,
    pub port: Option<u16>,
}

/// Resolves the account of the active session, if any.
pub trait IdentityLookup: Send + Sync {
    /// `None` when no session is initialized or nobody is logged in.
    fn current_account(&self) -> Option<Account>;
}

/// Resolves the person assigned to an account.
pub trait PersonResolver: Send + Sync {
    fn person_for(&self, account: &Account) -> Option<Person>;
}

/// Accessor for the active HTTP request. Absent in background jobs.
pub trait RequestLookup: Send + Sync {
    fn current_request(&self) -> Option<RequestInfo>;
}

impl IdentityLookup for Account {
    fn current_account(&self) -> Option<Account> {
        Some(self.clone())
    }
}

impl IdentityLookup for Option<Account> {
    fn current_account(&self) -> Option<Account> {
        self.clone()
    }
}

impl RequestLookup for RequestInfo {
    fn current_request(&self) -> Option<RequestInfo> {
        Some(self.clone())
    }
}

impl RequestLookup for Option<RequestInfo> {
    fn current_request(&self) -> Option<RequestInfo> {
        self.clone()
    }
}

impl<F> PersonResolver for F
where
    F: Fn(&Account) -> Option<Person> + Send + Sync,
{
    fn person_for(&self, account: &Account) -> Option<Person> {
        self(account)
    }
}

/// Per-call collaborators consulted while enriching an exception report.
#[derive(Clone, Copy, Default)]
pub struct ReportContext<'a> {
    pub identity: Option<&'a dyn IdentityLookup>,
    pub request: Option<&'a dyn RequestLookup>,
}

impl<'a> ReportContext<'a> {
    /// No session and no request, e.g. a background job.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, identity: &'a dyn IdentityLookup) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_request(mut self, request: &'a dyn RequestLookup) -> Self {
        self.request = Some(request);
        self
    }
}

impl std::fmt::Debug for ReportContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportContext")
            .field("identity", &self.identity.is_some())
            .field("request", &self.request.is_some())
            .finish()
    }
}
