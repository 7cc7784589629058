//! Bagisto REST API client.
//!
//! # Architecture
//!
//! - Bagisto is the source of truth for catalog, cart, wishlist, and orders;
//!   the storefront never stores those entities, it relays them as opaque JSON
//! - One [`BagistoClient`] is built at process start from the configured
//!   upstream origin and shared through `AppState`
//! - Every call goes through one `execute` path: resolve credentials, send,
//!   read text, parse JSON, check the fault table, capture the session cookie
//! - Only the category tree is cached (5 minute TTL); cart and catalog reads
//!   are always fresh
//!
//! # Example
//!
//! ```rust,ignore
//! use dukasasa_storefront::bagisto::{BagistoClient, UpstreamAuth};
//!
//! let client = BagistoClient::new(&config.bagisto)?;
//! let auth = UpstreamAuth::resolve(Some("Bearer tok123"), None);
//! let reply = client.get_cart(&auth).await?;
//! assert!(reply.is_success());
//! ```

mod auth;
mod cache;
mod client;
mod fault;
mod session;

pub use auth::UpstreamAuth;
pub use client::{BagistoClient, UpstreamResponse};
pub use fault::{FaultSignature, UpstreamFault, FAULT_SIGNATURES};
pub use session::SessionExtractor;

use std::fmt;

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur when talking to Bagisto.
///
/// An upstream answer that parsed as JSON and carries a non-2xx status is
/// not an error: it is returned as an [`UpstreamResponse`] and relayed with
/// `success: false`.
#[derive(Debug, Error)]
pub enum BagistoError {
    /// The HTTP client could not be constructed.
    #[error("failed to build upstream client: {0}")]
    Build(String),

    /// The request never produced a response (connect, TLS, timeout, body read).
    #[error("{operation}: upstream unreachable: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: reqwest::Error,
    },

    /// The upstream answered with a body that is not JSON.
    #[error("{operation}: upstream returned non-JSON body (HTTP {status})")]
    InvalidJson {
        operation: Operation,
        status: StatusCode,
        raw: String,
    },

    /// The upstream answered with a payload matching a known fault signature.
    #[error("{operation}: upstream fault {fault:?} (HTTP {status})")]
    Fault {
        operation: Operation,
        fault: UpstreamFault,
        status: StatusCode,
        error: serde_json::Value,
    },
}

impl BagistoError {
    /// The operation that failed, if the failure happened during a call.
    #[must_use]
    pub const fn operation(&self) -> Option<Operation> {
        match self {
            Self::Build(_) => None,
            Self::Transport { operation, .. }
            | Self::InvalidJson { operation, .. }
            | Self::Fault { operation, .. } => Some(*operation),
        }
    }
}

/// One upstream capability exposed by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Login,
    Register,
    ListProducts,
    GetProduct,
    SearchProducts,
    ListCategories,
    GetCart,
    AddToCart,
    RemoveCartItem,
    UpdateCart,
    SaveAddress,
    SaveShipping,
    SavePayment,
    SaveOrder,
    GetWishlist,
    AddToWishlist,
    RemoveFromWishlist,
}

impl Operation {
    /// Stable identifier used in logs and checkout progress reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::ListProducts => "list_products",
            Self::GetProduct => "get_product",
            Self::SearchProducts => "search_products",
            Self::ListCategories => "list_categories",
            Self::GetCart => "get_cart",
            Self::AddToCart => "add_to_cart",
            Self::RemoveCartItem => "remove_cart_item",
            Self::UpdateCart => "update_cart",
            Self::SaveAddress => "save_address",
            Self::SaveShipping => "save_shipping",
            Self::SavePayment => "save_payment",
            Self::SaveOrder => "save_order",
            Self::GetWishlist => "get_wishlist",
            Self::AddToWishlist => "add_to_wishlist",
            Self::RemoveFromWishlist => "remove_from_wishlist",
        }
    }

    /// Client-facing message used when the call could not complete.
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::Login => "Login failed. Please try again.",
            Self::Register => "Registration failed. Please try again.",
            Self::ListProducts => "Failed to fetch products.",
            Self::GetProduct => "Failed to fetch product.",
            Self::SearchProducts => "Failed to fetch search results.",
            Self::ListCategories => "Failed to fetch categories.",
            Self::GetCart => "Failed to fetch cart.",
            Self::AddToCart => "Failed to add to cart. Possibly a network or payload issue.",
            Self::RemoveCartItem => "Something went wrong while deleting item.",
            Self::UpdateCart => "Failed to update item quantity.",
            Self::SaveAddress => "Save address failed.",
            Self::SaveShipping => "Save shipping failed.",
            Self::SavePayment => "Save payment failed.",
            Self::SaveOrder => "Checkout failed.",
            Self::GetWishlist => "Failed to fetch wishlist.",
            Self::AddToWishlist => "Add to wishlist failed.",
            Self::RemoveFromWishlist => "Failed to remove item from wishlist.",
        }
    }

    /// Human label for the request payload, used in fault messages.
    #[must_use]
    pub const fn payload_label(self) -> &'static str {
        match self {
            Self::AddToCart => "product add-to-cart",
            Self::UpdateCart | Self::RemoveCartItem => "cart update",
            Self::SaveAddress => "checkout address",
            Self::SaveShipping => "shipping method",
            Self::SavePayment => "payment method",
            Self::SaveOrder => "order",
            Self::AddToWishlist | Self::RemoveFromWishlist => "wishlist",
            Self::Login | Self::Register => "customer",
            Self::ListProducts
            | Self::GetProduct
            | Self::SearchProducts
            | Self::ListCategories
            | Self::GetCart
            | Self::GetWishlist => "request",
        }
    }
}

/// One of the four Bagisto checkout calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStep {
    Address,
    Shipping,
    Payment,
    Order,
}

impl CheckoutStep {
    #[must_use]
    pub const fn operation(self) -> Operation {
        match self {
            Self::Address => Operation::SaveAddress,
            Self::Shipping => Operation::SaveShipping,
            Self::Payment => Operation::SavePayment,
            Self::Order => Operation::SaveOrder,
        }
    }

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Address => "/api/checkout/save-address",
            Self::Shipping => "/api/checkout/save-shipping",
            Self::Payment => "/api/checkout/save-payment",
            Self::Order => "/api/checkout/save-order",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_display_matches_serde() {
        let op = Operation::SaveShipping;
        assert_eq!(op.to_string(), "save_shipping");
        assert_eq!(
            serde_json::to_value(op).ok(),
            Some(serde_json::Value::String("save_shipping".to_string()))
        );
    }

    #[test]
    fn test_error_reports_operation() {
        let err = BagistoError::InvalidJson {
            operation: Operation::GetCart,
            status: StatusCode::BAD_GATEWAY,
            raw: "<html>".to_string(),
        };
        assert_eq!(err.operation(), Some(Operation::GetCart));
        assert_eq!(
            err.to_string(),
            "get_cart: upstream returned non-JSON body (HTTP 502 Bad Gateway)"
        );
        assert_eq!(BagistoError::Build("x".to_string()).operation(), None);
    }
}
