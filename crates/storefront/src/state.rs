//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use crate::bagisto::{BagistoClient, BagistoError};
use crate::config::StorefrontConfig;
use crate::services::intasend::{IntaSendClient, PaymentError};

/// Error building application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("bagisto client: {0}")]
    Bagisto(#[from] BagistoError),
    #[error("intasend client: {0}")]
    IntaSend(#[from] PaymentError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the upstream clients, the optional credential store, and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: Option<PgPool>,
    bagisto: BagistoClient,
    intasend: Option<IntaSendClient>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - Credential store pool, if one is configured
    ///
    /// # Errors
    ///
    /// Returns an error if an upstream client cannot be built.
    pub fn new(config: StorefrontConfig, pool: Option<PgPool>) -> Result<Self, StateError> {
        let bagisto = BagistoClient::new(&config.bagisto)?;
        let intasend = config
            .intasend
            .clone()
            .map(IntaSendClient::new)
            .transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                bagisto,
                intasend,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the credential store pool, if configured.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// Get a reference to the Bagisto API client.
    #[must_use]
    pub fn bagisto(&self) -> &BagistoClient {
        &self.inner.bagisto
    }

    /// Get the `IntaSend` client, if payment checkout is configured.
    #[must_use]
    pub fn intasend(&self) -> Option<&IntaSendClient> {
        self.inner.intasend.as_ref()
    }
}
