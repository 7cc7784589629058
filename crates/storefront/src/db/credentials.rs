//! Credential repository.
//!
//! Queries are checked at runtime (`query_as` with binds) so the crate builds
//! without a live database.

use sqlx::PgPool;

use dukasasa_core::{CredentialId, Email};

use super::RepositoryError;
use crate::models::credential::CredentialRecord;

/// Repository for `storefront.credential`.
pub struct CredentialRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CredentialRepository<'a> {
    /// Create a new credential repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the stored password hash for an email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(&self, email: &Email) -> Result<Option<String>, RepositoryError> {
        let hash: Option<(String,)> = sqlx::query_as(
            r"
            SELECT password_hash
            FROM storefront.credential
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(hash.map(|(hash,)| hash))
    }

    /// Insert a credential record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already stored.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn create(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<CredentialRecord, RepositoryError> {
        let row: (CredentialId, String, chrono::DateTime<chrono::Utc>) = sqlx::query_as(
            r"
            INSERT INTO storefront.credential (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, created_at
            ",
        )
        .bind(email.as_str())
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        let (id, email, created_at) = row;
        let email = Email::parse(&email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(CredentialRecord {
            id,
            email,
            created_at,
        })
    }
}
