//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAGISTO_BASE_URL` - Origin of the Bagisto REST API (e.g., `https://shop.example.co.ke`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (default: `http://localhost:3000`)
//! - `STOREFRONT_SESSION_COOKIE` - Local session cookie name (default: `bagisto-session`)
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` credential store (falls back to `DATABASE_URL`)
//! - `BAGISTO_SESSION_COOKIE` - Upstream session cookie key (default: `bagisto_session`)
//! - `BAGISTO_TIMEOUT_SECS` - Upstream request timeout (default: transport default)
//! - `INTASEND_PUBLIC_KEY` - `IntaSend` publishable key; enables payment checkout
//! - `INTASEND_BASE_URL` - `IntaSend` API origin (default: `https://payment.intasend.com`)
//! - `INTASEND_CURRENCY` - Checkout currency (default: KES)
//! - `INTASEND_REDIRECT_URL` - Where `IntaSend` sends the customer after paying
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use dukasasa_core::CurrencyCode;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Default upstream cookie key used by Bagisto.
pub const DEFAULT_UPSTREAM_COOKIE: &str = "bagisto_session";

/// Default name of the cookie the storefront sets on its own clients.
pub const DEFAULT_LOCAL_COOKIE: &str = "bagisto-session";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Name of the session cookie issued to storefront clients
    pub session_cookie: String,
    /// `PostgreSQL` credential store URL; `None` disables local credential checks
    pub database_url: Option<SecretString>,
    /// Bagisto REST API configuration
    pub bagisto: BagistoConfig,
    /// `IntaSend` checkout configuration; `None` disables the payment step
    pub intasend: Option<IntaSendConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Bagisto REST API configuration.
#[derive(Debug, Clone)]
pub struct BagistoConfig {
    /// Upstream origin, without a trailing slash
    pub base_url: Url,
    /// Cookie key Bagisto uses for its session
    pub session_cookie: String,
    /// Request timeout; `None` keeps the transport default
    pub timeout: Option<Duration>,
}

/// `IntaSend` hosted checkout configuration.
///
/// Implements `Debug` manually to redact the key.
#[derive(Clone)]
pub struct IntaSendConfig {
    /// API origin
    pub base_url: Url,
    /// Publishable key sent with checkout requests
    pub public_key: SecretString,
    /// Currency the checkout is charged in
    pub currency: CurrencyCode,
    /// Return URL after payment
    pub redirect_url: Option<String>,
}

impl std::fmt::Debug for IntaSendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntaSendConfig")
            .field("base_url", &self.base_url.as_str())
            .field("public_key", &"[REDACTED]")
            .field("currency", &self.currency)
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_env_or_default("STOREFRONT_BASE_URL", "http://localhost:3000");
        let session_cookie = get_env_or_default("STOREFRONT_SESSION_COOKIE", DEFAULT_LOCAL_COOKIE);
        let database_url = get_database_url("STOREFRONT_DATABASE_URL");

        let bagisto = BagistoConfig::from_env()?;
        if bagisto.session_cookie == session_cookie {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_SESSION_COOKIE".to_string(),
                "must differ from BAGISTO_SESSION_COOKIE".to_string(),
            ));
        }

        let intasend = IntaSendConfig::from_env()?;

        Ok(Self {
            host,
            port,
            base_url,
            session_cookie,
            database_url,
            bagisto,
            intasend,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Build a configuration for the given upstream with every optional
    /// feature disabled.
    #[must_use]
    pub fn for_upstream(base_url: Url) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_cookie: DEFAULT_LOCAL_COOKIE.to_string(),
            database_url: None,
            bagisto: BagistoConfig {
                base_url,
                session_cookie: DEFAULT_UPSTREAM_COOKIE.to_string(),
                timeout: None,
            },
            intasend: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BagistoConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = parse_base_url("BAGISTO_BASE_URL", &get_required_env("BAGISTO_BASE_URL")?)?;
        let timeout = get_optional_env("BAGISTO_TIMEOUT_SECS")
            .map(|raw| {
                raw.parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| {
                        ConfigError::InvalidEnvVar("BAGISTO_TIMEOUT_SECS".to_string(), e.to_string())
                    })
            })
            .transpose()?;

        Ok(Self {
            base_url,
            session_cookie: get_env_or_default("BAGISTO_SESSION_COOKIE", DEFAULT_UPSTREAM_COOKIE),
            timeout,
        })
    }
}

impl IntaSendConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(public_key) = get_optional_env("INTASEND_PUBLIC_KEY") else {
            return Ok(None);
        };

        let base_url = parse_base_url(
            "INTASEND_BASE_URL",
            &get_env_or_default("INTASEND_BASE_URL", "https://payment.intasend.com"),
        )?;
        let currency = get_env_or_default("INTASEND_CURRENCY", "KES")
            .parse::<CurrencyCode>()
            .map_err(|e| ConfigError::InvalidEnvVar("INTASEND_CURRENCY".to_string(), e.to_string()))?;

        Ok(Some(Self {
            base_url,
            public_key: SecretString::from(public_key),
            currency,
            redirect_url: get_optional_env("INTASEND_REDIRECT_URL"),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(SecretString::from)
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse an absolute http(s) origin, dropping any trailing slash.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim().trim_end_matches('/'))
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }

    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_parse_base_url_strips_trailing_slash() {
        let url = parse_base_url("X", "https://shop.example.co.ke/").unwrap();
        assert_eq!(url.as_str().trim_end_matches('/'), "https://shop.example.co.ke");
    }

    #[test]
    fn test_parse_base_url_rejects_non_http() {
        assert!(matches!(
            parse_base_url("X", "ftp://shop.example.co.ke"),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(parse_base_url("X", "not a url").is_err());
    }

    #[test]
    fn test_for_upstream_defaults() {
        let config = StorefrontConfig::for_upstream(Url::parse("http://127.0.0.1:9999").unwrap());
        assert_eq!(config.session_cookie, "bagisto-session");
        assert_eq!(config.bagisto.session_cookie, "bagisto_session");
        assert!(config.database_url.is_none());
        assert!(config.intasend.is_none());
        assert!(!config.secure_cookies());
    }

    #[test]
    fn test_socket_addr() {
        let mut config =
            StorefrontConfig::for_upstream(Url::parse("http://127.0.0.1:9999").unwrap());
        config.port = 8080;

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_secure_cookies_follow_base_url() {
        let mut config =
            StorefrontConfig::for_upstream(Url::parse("http://127.0.0.1:9999").unwrap());
        config.base_url = "https://jezkim.example.co.ke".to_string();
        assert!(config.secure_cookies());
    }

    #[test]
    fn test_intasend_config_debug_redacts_key() {
        let config = IntaSendConfig {
            base_url: Url::parse("https://payment.intasend.com").unwrap(),
            public_key: SecretString::from("ISPubKey_live_super_secret"),
            currency: CurrencyCode::KES,
            redirect_url: None,
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("payment.intasend.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret"));
        assert_eq!(config.public_key.expose_secret(), "ISPubKey_live_super_secret");
    }
}
