//! Domain models for the storefront.
//!
//! Catalog, cart, wishlist, and order payloads belong to Bagisto and are
//! relayed as opaque JSON; only the local credential types live here.

pub mod credential;

pub use credential::{CredentialRecord, Principal};
