//! Cache types for Bagisto responses.

use reqwest::StatusCode;
use serde_json::Value;

/// Cache key for shared, session-independent responses.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Categories,
}

/// A successful upstream answer kept for reuse.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub body: Value,
}
