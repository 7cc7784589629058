//! Known upstream fault signatures.
//!
//! Bagisto sometimes answers a bad request with HTTP 200 and a PHP notice in
//! the error message instead of a validation error. Those quirks are listed
//! here, once, and evaluated against every parsed response.

use reqwest::StatusCode;
use serde_json::Value;

/// Local classification of an upstream quirk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamFault {
    /// The upstream choked on the request body (wrong product type, missing
    /// options) and leaked an internal error.
    MalformedPayload,
}

impl UpstreamFault {
    /// Status the gateway answers with.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::MalformedPayload => StatusCode::BAD_REQUEST,
        }
    }

    /// Descriptive client-facing message.
    #[must_use]
    pub fn message(self, payload_label: &str) -> String {
        match self {
            Self::MalformedPayload => {
                format!("Invalid {payload_label} payload. Check product type and structure.")
            }
        }
    }
}

/// Substring of an upstream error message mapped to a local fault.
#[derive(Debug, Clone, Copy)]
pub struct FaultSignature {
    pub needle: &'static str,
    pub fault: UpstreamFault,
}

/// Every known signature, checked in order.
pub const FAULT_SIGNATURES: &[FaultSignature] = &[FaultSignature {
    needle: "Trying to get property 'status' of non-object",
    fault: UpstreamFault::MalformedPayload,
}];

/// Classify a parsed upstream body against [`FAULT_SIGNATURES`].
///
/// Looks at `error.message` and the top-level `message`, which is where
/// Laravel exception handlers put the text.
pub(crate) fn classify(body: &Value) -> Option<UpstreamFault> {
    let messages = [
        body.get("error").and_then(|e| e.get("message")),
        body.get("message"),
    ];

    messages
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find_map(|message| {
            FAULT_SIGNATURES
                .iter()
                .find(|signature| message.contains(signature.needle))
                .map(|signature| signature.fault)
        })
}
