//! Dukasasa Core - Shared types library.
//!
//! This crate provides common types used across the Dukasasa components:
//! - `storefront` - Gateway in front of the Bagisto commerce API
//! - `cli` - Command-line tools for migrations and credential management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. Catalog, cart, and order payloads stay opaque JSON owned
//! by the upstream backend; only the identifiers and amounts the gateway
//! itself has to reason about are typed here.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
