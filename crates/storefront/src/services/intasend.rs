//! `IntaSend` hosted checkout client.
//!
//! Creates a checkout session for a saved order and hands back the URL the
//! customer pays on. Payment completion is not verified server-side.

use std::sync::Arc;

use dukasasa_core::{CurrencyCode, Email, OrderId, Price};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::config::IntaSendConfig;

/// Errors that can occur when creating an `IntaSend` checkout.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The API answered without a checkout URL.
    #[error("checkout response carried no URL")]
    MissingCheckoutUrl,
}

/// Customer details collected by the checkout form.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: String,
}

/// A created checkout session.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    /// `IntaSend` checkout id, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Hosted payment page
    pub redirect_url: String,
}

#[derive(Serialize)]
struct CheckoutRequest<'a> {
    public_key: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    phone_number: &'a str,
    amount: String,
    currency: &'a str,
    api_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_url: Option<&'a str>,
}

#[derive(Deserialize)]
struct CheckoutResponse {
    id: Option<String>,
    url: Option<String>,
}

/// `IntaSend` API client. Cheap to clone.
#[derive(Clone)]
pub struct IntaSendClient {
    inner: Arc<IntaSendClientInner>,
}

struct IntaSendClientInner {
    client: reqwest::Client,
    config: IntaSendConfig,
}

impl IntaSendClient {
    /// Create a new `IntaSend` client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: IntaSendConfig) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(IntaSendClientInner { client, config }),
        })
    }

    /// Currency checkouts are created in.
    #[must_use]
    pub fn currency(&self) -> CurrencyCode {
        self.inner.config.currency
    }

    /// Create a checkout session for an order.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Api` for non-2xx answers and
    /// `PaymentError::MissingCheckoutUrl` when no URL comes back.
    #[instrument(skip(self, customer), fields(order_id = %order_id, amount = %amount))]
    pub async fn create_checkout(
        &self,
        customer: &PaymentCustomer,
        amount: &Price,
        order_id: OrderId,
    ) -> Result<CheckoutSession, PaymentError> {
        let config = &self.inner.config;
        let url = format!(
            "{}/api/v1/checkout/",
            config.base_url.as_str().trim_end_matches('/')
        );

        let body = CheckoutRequest {
            public_key: config.public_key.expose_secret(),
            first_name: &customer.first_name,
            last_name: &customer.last_name,
            email: customer.email.as_str(),
            phone_number: &customer.phone,
            amount: amount.amount_string(),
            currency: config.currency.code(),
            api_ref: order_id.to_string(),
            redirect_url: config.redirect_url.as_deref(),
        };

        let response = self.inner.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!(
                status = %status,
                body = %text.chars().take(500).collect::<String>(),
                "IntaSend rejected checkout"
            );
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message: text.chars().take(200).collect(),
            });
        }

        let parsed: CheckoutResponse =
            serde_json::from_str(&text).map_err(|_| PaymentError::MissingCheckoutUrl)?;
        let redirect_url = parsed
            .url
            .filter(|u| !u.is_empty())
            .ok_or(PaymentError::MissingCheckoutUrl)?;

        info!("IntaSend checkout created");

        Ok(CheckoutSession {
            id: parsed.id,
            redirect_url,
        })
    }
}
