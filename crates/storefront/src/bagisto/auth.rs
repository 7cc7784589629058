//! Credential resolution for upstream calls.

use std::fmt;

use reqwest::RequestBuilder;
use reqwest::header::COOKIE;

/// Credential attached to an upstream request.
///
/// A well-formed bearer token always wins over the session cookie; with
/// neither the call goes out unauthenticated and Bagisto decides whether
/// that is acceptable.
#[derive(Clone, PartialEq, Eq)]
pub enum UpstreamAuth {
    /// `Authorization: Bearer <token>` forwarded as-is.
    Bearer(String),
    /// Session cookie value, re-keyed under Bagisto's own cookie name.
    Session(String),
    /// No credential.
    Anonymous,
}

impl UpstreamAuth {
    /// Pick the credential for a request from its `Authorization` header and
    /// local session cookie value.
    #[must_use]
    pub fn resolve(authorization: Option<&str>, session_cookie: Option<&str>) -> Self {
        if let Some(token) = authorization.and_then(parse_bearer) {
            return Self::Bearer(token.to_owned());
        }

        match session_cookie.map(str::trim) {
            Some(value) if !value.is_empty() => Self::Session(value.to_owned()),
            _ => Self::Anonymous,
        }
    }

    /// Whether any credential is present.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        !matches!(self, Self::Anonymous)
    }

    /// Short name of the credential kind, safe to log.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bearer(_) => "bearer",
            Self::Session(_) => "session",
            Self::Anonymous => "anonymous",
        }
    }

    /// Follow a session token Bagisto issued mid-flow. A bearer token is
    /// kept; it identifies the customer regardless of session.
    #[must_use]
    pub fn with_session(self, token: String) -> Self {
        match self {
            Self::Bearer(_) => self,
            Self::Session(_) | Self::Anonymous => Self::Session(token),
        }
    }

    /// Attach the credential to an outgoing request.
    pub(crate) fn apply(&self, builder: RequestBuilder, upstream_cookie: &str) -> RequestBuilder {
        match self {
            Self::Bearer(token) => builder.bearer_auth(token),
            Self::Session(value) => builder.header(COOKIE, format!("{upstream_cookie}={value}")),
            Self::Anonymous => builder,
        }
    }
}

impl fmt::Debug for UpstreamAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer([REDACTED])"),
            Self::Session(_) => f.write_str("Session([REDACTED])"),
            Self::Anonymous => f.write_str("Anonymous"),
        }
    }
}

/// Extract the token from a `Bearer <token>` header value.
///
/// The scheme is matched case-insensitively; the token must be non-empty and
/// free of whitespace.
fn parse_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return None;
    }

    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_takes_precedence_over_session() {
        let auth = UpstreamAuth::resolve(Some("Bearer tok123"), Some("sess"));
        assert_eq!(auth, UpstreamAuth::Bearer("tok123".to_string()));
    }

    #[test]
    fn test_malformed_bearer_falls_back_to_session() {
        for header in ["Basic dXNlcjpwYXNz", "Bearer", "Bearer ", "Bearer a b", "tok123"] {
            let auth = UpstreamAuth::resolve(Some(header), Some("sess"));
            assert_eq!(auth, UpstreamAuth::Session("sess".to_string()), "{header}");
        }
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let auth = UpstreamAuth::resolve(Some("bearer tok"), None);
        assert_eq!(auth, UpstreamAuth::Bearer("tok".to_string()));
    }

    #[test]
    fn test_nothing_present_is_anonymous() {
        assert_eq!(UpstreamAuth::resolve(None, None), UpstreamAuth::Anonymous);
        assert_eq!(UpstreamAuth::resolve(None, Some("  ")), UpstreamAuth::Anonymous);
        assert!(!UpstreamAuth::Anonymous.is_present());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let debug = format!("{:?}", UpstreamAuth::Bearer("secret-token".to_string()));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn test_issued_session_replaces_old_one() {
        let auth = UpstreamAuth::Session("old".to_string()).with_session("new".to_string());
        assert_eq!(auth, UpstreamAuth::Session("new".to_string()));

        let auth = UpstreamAuth::Anonymous.with_session("new".to_string());
        assert_eq!(auth, UpstreamAuth::Session("new".to_string()));

        let auth = UpstreamAuth::Bearer("tok".to_string()).with_session("new".to_string());
        assert_eq!(auth, UpstreamAuth::Bearer("tok".to_string()));
    }
}
