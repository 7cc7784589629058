//! Credential domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use dukasasa_core::{CredentialId, Email};

/// A stored credential (domain type). The hash never leaves the repository.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    /// Database ID.
    pub id: CredentialId,
    /// Unique login identifier.
    pub email: Email,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

/// Minimal principal yielded by a successful credential check.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub email: Email,
    /// Opaque placeholder token; Bagisto tokens are only issued by `/login`.
    pub access_token: String,
}

impl Principal {
    /// Build a principal with a freshly generated placeholder token.
    #[must_use]
    pub fn issue(email: Email) -> Self {
        Self {
            email,
            access_token: Uuid::new_v4().to_string(),
        }
    }
}
