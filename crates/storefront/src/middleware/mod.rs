//! HTTP middleware stack for the storefront gateway.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, transactions)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//!
//! Session handling is not a layer: handlers pull credentials with the
//! [`UpstreamCredentials`] and [`RequireCredentials`] extractors.

pub mod request_id;
pub mod security_headers;
pub mod session;

pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::{RequireCredentials, UpstreamCredentials, read_cookie, session_cookie};
