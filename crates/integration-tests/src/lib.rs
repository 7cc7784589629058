//! Integration tests for the Dukasasa storefront gateway.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p dukasasa-integration-tests
//! ```
//!
//! No database or real Bagisto is needed: each test starts a `wiremock`
//! server standing in for Bagisto, binds the storefront router on an
//! ephemeral port, and drives it over HTTP with `reqwest`.

use std::net::SocketAddr;

use dukasasa_storefront::config::StorefrontConfig;
use dukasasa_storefront::state::AppState;
use reqwest::Client;
use url::Url;
use wiremock::MockServer;

/// Local session cookie name used by the default configuration.
pub const LOCAL_SESSION_COOKIE: &str = "bagisto-session";

/// Serve the storefront on an ephemeral port, proxying `upstream`.
///
/// # Panics
///
/// Panics if the listener cannot be bound or the state cannot be built.
pub async fn spawn_storefront(upstream: Url) -> SocketAddr {
    let config = StorefrontConfig::for_upstream(upstream);
    let state = AppState::new(config, None).expect("failed to build app state");
    let app = dukasasa_storefront::app(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind ephemeral port");
    let addr = listener.local_addr().expect("listener has an address");

    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("storefront server failed");
    });

    addr
}

/// A running storefront wired to a stubbed Bagisto.
pub struct TestContext {
    /// Stub upstream. Mount expectations on it before sending requests.
    pub upstream: MockServer,
    /// Plain client (no cookie jar) so tests see raw `Set-Cookie` headers.
    pub client: Client,
    addr: SocketAddr,
}

impl TestContext {
    /// Start the stub upstream and the storefront.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound or the state cannot be built.
    pub async fn start() -> Self {
        let upstream = MockServer::start().await;
        let addr = spawn_storefront(
            Url::parse(&upstream.uri()).expect("mock server uri is a valid URL"),
        )
        .await;

        Self {
            upstream,
            client: Client::new(),
            addr,
        }
    }

    /// Absolute URL for a storefront path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// A client that keeps cookies between calls, like a browser would.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn browser(&self) -> Client {
        Client::builder()
            .cookie_store(true)
            .build()
            .expect("failed to build cookie-keeping client")
    }
}
