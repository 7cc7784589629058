//! Business logic services for the storefront gateway.
//!
//! # Services
//!
//! - `auth` - Local credential check (Argon2id hashes in `PostgreSQL`)
//! - `checkout` - Sequenced Bagisto checkout with optional `IntaSend` payment
//! - `intasend` - `IntaSend` hosted checkout client

pub mod auth;
pub mod checkout;
pub mod intasend;
