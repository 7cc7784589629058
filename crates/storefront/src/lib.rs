//! Dukasasa storefront gateway library.
//!
//! A JSON proxy in front of a Bagisto commerce backend: every storefront
//! operation becomes one upstream call, with session cookies re-keyed and
//! known upstream faults translated into one failure envelope. Built as a
//! library so the router can be driven from tests and the CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod bagisto;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, extract::Request};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the complete router with its middleware stack.
///
/// Sentry layers are outermost so every request gets its own hub, then the
/// request span, the request id (recorded into that span), and the security
/// headers.
pub fn app(state: AppState) -> Router {
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = tracing::field::Empty,
        )
    });

    routes::routes()
        .layer(axum::middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(trace)
        .with_state(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
