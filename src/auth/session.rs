//! Session state shared by every request to the service.

use std::collections::BTreeMap;

use reqwest::RequestBuilder;
use reqwest::header::COOKIE;

/// Cookie carrying the anti-forgery token.
pub const CSRF_COOKIE: &str = "csrftoken";

/// Request header carrying the anti-forgery token.
pub const CSRF_HEADER: &str = "x-csrftoken";

/// Outbound headers, cookies and authentication state for one connection
/// to the service.
///
/// Header names are stored lowercase so updates are case-insensitive and
/// last-write-wins. Sessions are only created by
/// [`Authenticator`](super::Authenticator); every request API in this crate
/// borrows one, so no request can be issued without a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    headers: BTreeMap<String, String>,
    cookies: BTreeMap<String, String>,
    authenticated: bool,
    csrf_token: Option<String>,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
            authenticated: false,
            csrf_token: None,
        }
    }

    /// Returns the value of a header, if set.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns all outbound headers (lowercase names).
    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Returns the value of a stored cookie, if any.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Returns all stored cookies.
    #[must_use]
    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    /// Whether a credentialed login succeeded and has not been torn down.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Current anti-forgery token.
    #[must_use]
    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    pub(crate) fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    pub(crate) fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub(crate) fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
    }

    /// Installs a new anti-forgery token as both session state and request header.
    pub(crate) fn install_csrf_token(&mut self, token: impl Into<String>) {
        let token = token.into();
        self.set_header(CSRF_HEADER, token.clone());
        self.csrf_token = Some(token);
    }

    /// Renders the cookie jar as a `Cookie` request header value.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Attaches session headers and cookies to an outgoing request.
    pub(crate) fn apply(&self, mut request: RequestBuilder) -> RequestBuilder {
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(cookie) = self.cookie_header() {
            request = request.header(COOKIE, cookie);
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_updates_are_case_insensitive_last_write_wins() {
        let mut session = Session::new();
        session.set_header("User-Agent", "first");
        session.set_header("user-agent", "second");
        assert_eq!(session.header("USER-AGENT"), Some("second"));
        assert_eq!(session.headers().len(), 1);
    }

    #[test]
    fn test_install_csrf_token_sets_header_and_state() {
        let mut session = Session::new();
        session.install_csrf_token("abc");
        assert_eq!(session.csrf_token(), Some("abc"));
        assert_eq!(session.header("X-CSRFToken"), Some("abc"));

        session.install_csrf_token("rotated");
        assert_eq!(session.csrf_token(), Some("rotated"));
        assert_eq!(session.header(CSRF_HEADER), Some("rotated"));
    }

    #[test]
    fn test_cookie_header_joins_jar() {
        let mut session = Session::new();
        assert_eq!(session.cookie_header(), None);

        session.set_cookie("csrftoken", "abc");
        session.set_cookie("mid", "xyz");
        assert_eq!(
            session.cookie_header().as_deref(),
            Some("csrftoken=abc; mid=xyz")
        );
    }

    #[test]
    fn test_new_session_is_anonymous() {
        let session = Session::new();
        assert!(!session.is_authenticated());
        assert!(session.csrf_token().is_none());
    }
}
