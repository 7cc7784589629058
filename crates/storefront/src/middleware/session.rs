//! Client session handling.
//!
//! The storefront never stores sessions. It keeps Bagisto's session token in
//! a cookie of its own (named differently from Bagisto's) and re-keys it on
//! the way upstream.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
};
use cookie::{Cookie, SameSite};

use crate::bagisto::UpstreamAuth;
use crate::config::StorefrontConfig;
use crate::error::AppError;
use crate::state::AppState;

/// Read a cookie value by name from the request's `Cookie` headers.
#[must_use]
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_owned())
}

/// Build the local session cookie carrying an upstream-issued token.
#[must_use]
pub fn session_cookie(config: &StorefrontConfig, token: String) -> Cookie<'static> {
    Cookie::build((config.session_cookie.clone(), token))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(config.secure_cookies())
        .build()
}

/// Resolve the upstream credential for a request.
fn resolve(parts: &Parts, config: &StorefrontConfig) -> UpstreamAuth {
    let authorization = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let session = read_cookie(&parts.headers, &config.session_cookie);

    UpstreamAuth::resolve(authorization, session.as_deref())
}

/// Extractor yielding whatever credential the request carries.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(UpstreamCredentials(auth): UpstreamCredentials) -> impl IntoResponse {
///     tracing::debug!(auth = auth.kind(), "resolved credential");
/// }
/// ```
pub struct UpstreamCredentials(pub UpstreamAuth);

impl FromRequestParts<AppState> for UpstreamCredentials {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve(parts, state.config())))
    }
}

/// Extractor that rejects with 400 when neither a bearer token nor a session
/// cookie is present. Used by cart mutations, which Bagisto cannot attribute
/// to a cart without one.
pub struct RequireCredentials(pub UpstreamAuth);

impl FromRequestParts<AppState> for RequireCredentials {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = resolve(parts, state.config());
        if auth.is_present() {
            Ok(Self(auth))
        } else {
            Err(AppError::BadRequest("Missing session or token.".to_string()))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;
    use url::Url;

    use super::*;

    fn config() -> StorefrontConfig {
        StorefrontConfig::for_upstream(Url::parse("http://127.0.0.1:9").unwrap())
    }

    #[test]
    fn test_read_cookie_among_many() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; bagisto-session=abc%3D; other=1"),
        );
        assert_eq!(
            read_cookie(&headers, "bagisto-session").as_deref(),
            Some("abc%3D")
        );
        assert_eq!(read_cookie(&headers, "bagisto_session"), None);
    }

    #[test]
    fn test_read_cookie_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1"));
        headers.append(COOKIE, HeaderValue::from_static("bagisto-session=xyz"));
        assert_eq!(read_cookie(&headers, "bagisto-session").as_deref(), Some("xyz"));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie(&config(), "tok".to_string());
        let rendered = cookie.to_string();
        assert!(rendered.starts_with("bagisto-session=tok"));
        assert!(rendered.contains("HttpOnly"));
        assert!(rendered.contains("Path=/"));
        assert!(rendered.contains("SameSite=Lax"));
        assert!(!rendered.contains("Secure"));
    }

    #[test]
    fn test_session_cookie_secure_on_https() {
        let mut config = config();
        config.base_url = "https://shop.example.co.ke".to_string();
        let cookie = session_cookie(&config, "tok".to_string());
        assert_eq!(cookie.secure(), Some(true));
    }
}
