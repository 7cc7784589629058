//! Session token capture from upstream `Set-Cookie` headers.

use regex::Regex;
use reqwest::header::{HeaderMap, SET_COOKIE};

use super::BagistoError;

/// Pulls Bagisto's session token out of response headers.
#[derive(Debug, Clone)]
pub struct SessionExtractor {
    pattern: Regex,
}

impl SessionExtractor {
    /// Build an extractor for the given upstream cookie key.
    ///
    /// # Errors
    ///
    /// Returns [`BagistoError::Build`] if the key cannot form a pattern.
    pub fn new(cookie_key: &str) -> Result<Self, BagistoError> {
        let pattern = Regex::new(&format!(
            r"(?:^|[\s;,]){}=([^;,\s]+)",
            regex::escape(cookie_key)
        ))
        .map_err(|e| BagistoError::Build(format!("invalid session cookie key: {e}")))?;

        Ok(Self { pattern })
    }

    /// Find the token in a single `Set-Cookie` value.
    #[must_use]
    pub fn from_header_value(&self, value: &str) -> Option<String> {
        self.pattern
            .captures_iter(value)
            .filter_map(|caps| caps.get(1))
            .last()
            .map(|m| m.as_str().to_owned())
    }

    /// Find the token across every `Set-Cookie` header; the last one wins.
    #[must_use]
    pub fn from_headers(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| self.from_header_value(value))
            .last()
    }
}
