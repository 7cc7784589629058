//! Unified error handling with Sentry integration.
//!
//! Every failure leaves the gateway as the same JSON envelope:
//!
//! ```json
//! { "success": false, "message": "...", "error": { ... }, "raw": "..." }
//! ```
//!
//! `error` and `raw` are only present when there is something to show.
//! Server-side failures are captured to Sentry before responding.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::bagisto::BagistoError;
use crate::services::auth::AuthError;
use crate::services::intasend::PaymentError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bagisto call failed.
    #[error("Upstream error: {0}")]
    Upstream(#[from] BagistoError),

    /// `IntaSend` call failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Credential check failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Missing or invalid client input.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// The failure envelope.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl Failure {
    /// An envelope with only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: None,
            raw: None,
        }
    }

    #[must_use]
    pub fn with_error(mut self, error: Value) -> Self {
        self.error = Some(error);
        self
    }
}

impl AppError {
    /// Whether the error is the server's fault and should reach Sentry.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Upstream(BagistoError::Fault { .. }) | Self::BadRequest(_) => false,
            Self::Auth(err) => matches!(err, AuthError::Repository(_) | AuthError::PasswordHash),
            Self::Upstream(_) | Self::Payment(_) => true,
        }
    }

    /// Status and envelope for this error. Internal details never reach the client.
    #[must_use]
    pub fn to_failure(&self) -> (StatusCode, Failure) {
        match self {
            Self::Upstream(err) => upstream_failure(err),
            Self::Payment(err) => match err {
                PaymentError::Api { status, .. } => (
                    StatusCode::BAD_GATEWAY,
                    Failure::message("Payment provider rejected the checkout")
                        .with_error(Value::from(*status)),
                ),
                PaymentError::Transport(_) | PaymentError::MissingCheckoutUrl => (
                    StatusCode::BAD_GATEWAY,
                    Failure::message("Payment provider unavailable"),
                ),
            },
            Self::Auth(err) => auth_failure(err),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, Failure::message(message)),
        }
    }
}

fn upstream_failure(err: &BagistoError) -> (StatusCode, Failure) {
    match err {
        BagistoError::Build(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Failure::message("Internal server error"),
        ),
        BagistoError::Transport { operation, .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Failure::message(operation.failure_message())
                .with_error(Value::from("Upstream service unreachable")),
        ),
        BagistoError::InvalidJson { status, raw, .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Failure {
                success: false,
                message: "Invalid upstream response".to_string(),
                error: Some(Value::from(status.as_u16())),
                raw: Some(raw.clone()),
            },
        ),
        BagistoError::Fault {
            operation,
            fault,
            error,
            ..
        } => (
            fault.status(),
            Failure::message(fault.message(operation.payload_label())).with_error(error.clone()),
        ),
    }
}

fn auth_failure(err: &AuthError) -> (StatusCode, Failure) {
    match err {
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            Failure::message("Invalid credentials"),
        ),
        AuthError::InvalidEmail(_) => (
            StatusCode::BAD_REQUEST,
            Failure::message("Invalid email address"),
        ),
        AuthError::WeakPassword(msg) => (StatusCode::BAD_REQUEST, Failure::message(msg)),
        AuthError::UserAlreadyExists => (
            StatusCode::CONFLICT,
            Failure::message("A credential for this email already exists"),
        ),
        AuthError::Disabled => (
            StatusCode::SERVICE_UNAVAILABLE,
            Failure::message("Credential check is not available"),
        ),
        AuthError::Repository(_) | AuthError::PasswordHash => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Failure::message("Authentication error"),
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let (status, failure) = self.to_failure();
        (status, Json(failure)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode as UpstreamStatus;
    use serde_json::json;

    use super::*;
    use crate::bagisto::{Operation, UpstreamFault};

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("item_id is required".to_string());
        assert_eq!(err.to_string(), "Bad request: item_id is required");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AuthError::InvalidCredentials.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AuthError::Disabled.into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(PaymentError::MissingCheckoutUrl.into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AuthError::PasswordHash.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_invalid_json_keeps_raw_text() {
        let err = AppError::Upstream(BagistoError::InvalidJson {
            operation: Operation::AddToCart,
            status: UpstreamStatus::OK,
            raw: "<b>Fatal error</b>".to_string(),
        });

        let (status, failure) = err.to_failure();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failure.raw.as_deref(), Some("<b>Fatal error</b>"));
        assert_eq!(failure.message, "Invalid upstream response");
    }

    #[test]
    fn test_fault_hides_upstream_text_in_message() {
        let err = AppError::Upstream(BagistoError::Fault {
            operation: Operation::AddToCart,
            fault: UpstreamFault::MalformedPayload,
            status: UpstreamStatus::OK,
            error: json!({ "message": "Trying to get property 'status' of non-object" }),
        });

        let (status, failure) = err.to_failure();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!failure.message.contains("non-object"));
        assert!(failure.error.is_some());
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_envelope_omits_empty_fields() {
        let json = serde_json::to_value(Failure::message("nope")).unwrap_or_default();
        assert_eq!(json, json!({ "success": false, "message": "nope" }));
    }
}
