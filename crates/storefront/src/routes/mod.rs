//! HTTP route handlers for the storefront gateway.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                         - Liveness
//! GET    /health/ready                   - Readiness (checks the credential store)
//!
//! # Local credential check
//! POST   /api/auth/credentials           - Verify email + password
//!
//! # Bagisto proxy (/api/proxy)
//! POST   /login                          - Customer login (token)
//! POST   /register                       - Customer registration
//! GET    /products                       - Product page (?limit=&page=)
//! GET    /products/{slug}                - Product detail
//! GET    /search                         - Product search (?search=&page=)
//! GET    /categories                     - Category tree (cached)
//! GET    /cart                           - Current cart
//! PATCH  /cart                           - Update line quantity
//! DELETE /cart                           - Remove line
//! POST   /cart/add/{product_id}          - Add product
//! POST   /cart/save-address              - Checkout step
//! POST   /cart/save-shipping             - Checkout step
//! POST   /cart/save-payment              - Checkout step
//! POST   /cart/checkout                  - Save order
//! POST   /checkout                       - All checkout steps in sequence
//! GET    /wishlist                       - Wishlist
//! POST   /wishlist/{product_id}          - Add to wishlist
//! DELETE /wishlist/{product_id}          - Remove from wishlist
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod extract;
pub mod health;
pub mod products;
pub mod wishlist;

use axum::{
    Json, Router,
    http::{HeaderValue, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use cookie::Cookie;
use serde_json::{Map, Value};

use crate::bagisto::{Operation, UpstreamResponse};
use crate::config::StorefrontConfig;
use crate::middleware::session_cookie;
use crate::state::AppState;

// =============================================================================
// Responses
// =============================================================================

/// JSON response relayed from an upstream call, with the refreshed session
/// cookie when upstream issued one.
#[derive(Debug)]
pub struct ProxyReply {
    status: StatusCode,
    body: Value,
    cookie: Option<Cookie<'static>>,
}

impl ProxyReply {
    #[must_use]
    pub const fn new(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body,
            cookie: None,
        }
    }

    /// Attach the local session cookie for an upstream-issued token.
    #[must_use]
    pub fn with_session(mut self, config: &StorefrontConfig, token: Option<String>) -> Self {
        self.cookie = token.map(|token| session_cookie(config, token));
        self
    }

    /// Relay `body` with the upstream status and session.
    #[must_use]
    pub fn relay(state: &AppState, upstream: UpstreamResponse, body: Value) -> Self {
        Self::new(upstream.status, body).with_session(state.config(), upstream.session)
    }

    /// Relay an upstream answer as `{success: true, <key>: value}`, or as the
    /// failure envelope carrying the upstream body when the status is not 2xx.
    #[must_use]
    pub fn envelope(
        state: &AppState,
        operation: Operation,
        upstream: UpstreamResponse,
        key: &str,
        select: impl FnOnce(Value) -> Value,
    ) -> Self {
        let mut object = Map::new();
        if upstream.is_success() {
            object.insert("success".to_string(), Value::Bool(true));
            object.insert(key.to_string(), select(upstream.body.clone()));
        } else {
            object.insert("success".to_string(), Value::Bool(false));
            object.insert(
                "message".to_string(),
                Value::from(operation.failure_message()),
            );
            object.insert("error".to_string(), upstream.body.clone());
        }

        Self::relay(state, upstream, Value::Object(object))
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub const fn body(&self) -> &Value {
        &self.body
    }
}

impl IntoResponse for ProxyReply {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();

        if let Some(cookie) = self.cookie {
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(value) => {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Upstream session token is not a valid header value");
                }
            }
        }

        response
    }
}

// =============================================================================
// Routers
// =============================================================================

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(cart::show).patch(cart::update).delete(cart::remove),
        )
        .route("/add/{product_id}", post(cart::add))
        .route("/save-address", post(cart::save_address))
        .route("/save-shipping", post(cart::save_shipping))
        .route("/save-payment", post(cart::save_payment))
        .route("/checkout", post(cart::place_order))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::index))
        .route(
            "/{product_id}",
            post(wishlist::add).delete(wishlist::remove),
        )
}

/// Create the Bagisto proxy router.
pub fn proxy_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/products", get(products::index))
        .route("/products/{slug}", get(products::show))
        .route("/search", get(products::search))
        .route("/categories", get(products::categories))
        .nest("/cart", cart_routes())
        .route("/checkout", post(checkout::checkout))
        .nest("/wishlist", wishlist_routes())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/api/auth/credentials", post(auth::credentials))
        .nest("/api/proxy", proxy_routes())
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Router harness backed by a wiremock upstream.

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, Response};
    use serde_json::Value;
    use tower::ServiceExt;
    use url::Url;
    use wiremock::MockServer;

    use crate::config::StorefrontConfig;
    use crate::state::AppState;

    pub fn app_for(server: &MockServer) -> axum::Router {
        let config = StorefrontConfig::for_upstream(
            Url::parse(&server.uri()).unwrap_or_else(|e| panic!("mock uri: {e}")),
        );
        let state = AppState::new(config, None).unwrap_or_else(|e| panic!("state: {e}"));
        crate::app(state)
    }

    pub async fn send(app: axum::Router, request: Request<Body>) -> (Response<Body>, Value) {
        let response = app
            .oneshot(request)
            .await
            .unwrap_or_else(|e| match e {});
        let (parts, body) = response.into_parts();
        let bytes = to_bytes(body, usize::MAX)
            .await
            .unwrap_or_else(|e| panic!("body: {e}"));
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (Response::from_parts(parts, Body::empty()), json)
    }

    pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap_or_else(|e| panic!("request: {e}"))
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap_or_else(|e| panic!("request: {e}"))
    }
}
