//! Local credential management.
//!
//! # Usage
//!
//! ```bash
//! duka-cli credential create -e customer@example.co.ke -p 'long-enough'
//! ```
//!
//! Creates the record the direct credential check (`POST /api/auth/credentials`)
//! verifies against. Bagisto accounts are not touched.

use dukasasa_core::CredentialId;
use dukasasa_storefront::services::auth::AuthService;

use super::{CommandError, connect};

/// Create a local credential record.
///
/// # Errors
///
/// Returns an error if the email is invalid, the password is too short, the
/// email is already stored, or the database is unreachable.
pub async fn create(email: &str, password: &str) -> Result<CredentialId, CommandError> {
    let pool = connect().await?;

    tracing::info!("Creating credential: {}", email);
    let record = AuthService::new(&pool)
        .register_with_password(email, password)
        .await?;

    tracing::info!(
        "Credential created (id {}, {})",
        record.id,
        record.created_at.to_rfc3339()
    );
    Ok(record.id)
}
