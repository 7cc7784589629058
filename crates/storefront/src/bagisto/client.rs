//! Bagisto REST client implementation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dukasasa_core::{CartItemId, ProductId};
use moka::future::Cache;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, error, instrument, warn};

use super::cache::{CacheKey, CachedResponse};
use super::fault;
use super::{BagistoError, CheckoutStep, Operation, SessionExtractor, UpstreamAuth};
use crate::config::BagistoConfig;

/// How long the category tree is reused.
const CATEGORY_TTL: Duration = Duration::from_secs(300);

/// Longest body excerpt written to logs.
const LOG_EXCERPT_CHARS: usize = 500;

/// A parsed upstream answer.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    /// Upstream HTTP status
    pub status: StatusCode,
    /// Parsed JSON body (`Null` when the body was empty)
    pub body: Value,
    /// Session token issued by this response, if any
    pub session: Option<String>,
}

impl UpstreamResponse {
    /// Whether the upstream status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Client for the Bagisto REST API.
///
/// Cheap to clone; all clones share one connection pool and cache.
#[derive(Clone)]
pub struct BagistoClient {
    inner: Arc<BagistoClientInner>,
}

struct BagistoClientInner {
    client: reqwest::Client,
    base_url: String,
    session_cookie: String,
    session: SessionExtractor,
    cache: Cache<CacheKey, CachedResponse>,
}

impl BagistoClient {
    /// Create a new client for the configured upstream.
    ///
    /// # Errors
    ///
    /// Returns [`BagistoError::Build`] if the HTTP client or the session
    /// pattern cannot be constructed.
    pub fn new(config: &BagistoConfig) -> Result<Self, BagistoError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| BagistoError::Build(e.to_string()))?;

        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(CATEGORY_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(BagistoClientInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                session_cookie: config.session_cookie.clone(),
                session: SessionExtractor::new(&config.session_cookie)?,
                cache,
            }),
        })
    }

    /// Send one request and classify the answer.
    ///
    /// Reads the body as text before parsing so that HTML error pages end up
    /// in [`BagistoError::InvalidJson`] instead of a decode failure.
    #[instrument(
        skip(self, query, auth, body),
        fields(operation = %operation, auth = auth.kind(), status, elapsed_ms)
    )]
    async fn execute(
        &self,
        operation: Operation,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        auth: &UpstreamAuth,
        body: Option<&Value>,
    ) -> Result<UpstreamResponse, BagistoError> {
        let url = format!("{}{path}", self.inner.base_url);
        let started = Instant::now();

        let mut request = self.inner.client.request(method, &url);
        if !query.is_empty() {
            request = request.query(query);
        }
        request = auth.apply(request, &self.inner.session_cookie);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| {
            error!(error = %source, "Bagisto request failed");
            BagistoError::Transport { operation, source }
        })?;

        let status = response.status();
        let session = self.inner.session.from_headers(response.headers());
        let text = response
            .text()
            .await
            .map_err(|source| BagistoError::Transport { operation, source })?;

        let span = tracing::Span::current();
        span.record("status", status.as_u16());
        span.record(
            "elapsed_ms",
            u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        );

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str::<Value>(&text) {
                Ok(value) => value,
                Err(e) => {
                    error!(
                        error = %e,
                        status = %status,
                        body = %excerpt(&text),
                        "Bagisto returned a non-JSON body"
                    );
                    return Err(BagistoError::InvalidJson {
                        operation,
                        status,
                        raw: text,
                    });
                }
            }
        };

        if let Some(fault) = fault::classify(&body) {
            warn!(
                fault = ?fault,
                status = %status,
                body = %excerpt(&text),
                "Bagisto response matched a fault signature"
            );
            let error = body.get("error").cloned().unwrap_or(body);
            return Err(BagistoError::Fault {
                operation,
                fault,
                status,
                error,
            });
        }

        if status.is_success() {
            debug!(session_issued = session.is_some(), "Bagisto request succeeded");
        } else {
            warn!(status = %status, body = %excerpt(&text), "Bagisto rejected request");
        }

        Ok(UpstreamResponse {
            status,
            body,
            session,
        })
    }

    // =========================================================================
    // Customer
    // =========================================================================

    /// Exchange customer credentials for an API token.
    ///
    /// # Errors
    ///
    /// Returns `BagistoError` on transport, decode, or fault-signature failure.
    pub async fn login(&self, credentials: &Value) -> Result<UpstreamResponse, BagistoError> {
        self.execute(
            Operation::Login,
            Method::POST,
            "/api/customer/login",
            &[("token", "true".to_string())],
            &UpstreamAuth::Anonymous,
            Some(credentials),
        )
        .await
    }

    /// Create a customer account.
    ///
    /// # Errors
    ///
    /// Returns `BagistoError` on transport, decode, or fault-signature failure.
    pub async fn register(&self, customer: &Value) -> Result<UpstreamResponse, BagistoError> {
        self.execute(
            Operation::Register,
            Method::POST,
            "/api/v1/customer/register",
            &[],
            &UpstreamAuth::Anonymous,
            Some(customer),
        )
        .await
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// List one page of products.
    ///
    /// # Errors
    ///
    /// Returns `BagistoError` on transport, decode, or fault-signature failure.
    pub async fn list_products(
        &self,
        auth: &UpstreamAuth,
        limit: u32,
        page: u32,
    ) -> Result<UpstreamResponse, BagistoError> {
        self.execute(
            Operation::ListProducts,
            Method::GET,
            "/api/products",
            &[("limit", limit.to_string()), ("page", page.to_string())],
            auth,
            None,
        )
        .await
    }

    /// Fetch one product by its URL key.
    ///
    /// # Errors
    ///
    /// Returns `BagistoError` on transport, decode, or fault-signature failure.
    pub async fn get_product(
        &self,
        auth: &UpstreamAuth,
        slug: &str,
    ) -> Result<UpstreamResponse, BagistoError> {
        let path = format!("/api/products/slug/{}", urlencoding::encode(slug));
        self.execute(Operation::GetProduct, Method::GET, &path, &[], auth, None)
            .await
    }

    /// Full-text product search.
    ///
    /// # Errors
    ///
    /// Returns `BagistoError` on transport, decode, or fault-signature failure.
    pub async fn search_products(
        &self,
        auth: &UpstreamAuth,
        search: &str,
        page: u32,
    ) -> Result<UpstreamResponse, BagistoError> {
        self.execute(
            Operation::SearchProducts,
            Method::GET,
            "/api/products",
            &[("search", search.to_string()), ("page", page.to_string())],
            auth,
            None,
        )
        .await
    }

    /// Category tree, served from cache for five minutes after a 2xx answer.
    ///
    /// # Errors
    ///
    /// Returns `BagistoError` on transport, decode, or fault-signature failure.
    pub async fn list_categories(
        &self,
        auth: &UpstreamAuth,
    ) -> Result<UpstreamResponse, BagistoError> {
        if let Some(cached) = self.inner.cache.get(&CacheKey::Categories).await {
            debug!("Cache hit for categories");
            return Ok(UpstreamResponse {
                status: cached.status,
                body: cached.body,
                session: None,
            });
        }

        let response = self
            .execute(
                Operation::ListCategories,
                Method::GET,
                "/api/categories",
                &[],
                auth,
                None,
            )
            .await?;

        if response.is_success() {
            self.inner
                .cache
                .insert(
                    CacheKey::Categories,
                    CachedResponse {
                        status: response.status,
                        body: response.body.clone(),
                    },
                )
                .await;
        }

        Ok(response)
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Current cart for the credential's session.
    ///
    /// # Errors
    ///
    /// Returns `BagistoError` on transport, decode, or fault-signature failure.
    pub async fn get_cart(&self, auth: &UpstreamAuth) -> Result<UpstreamResponse, BagistoError> {
        self.execute(
            Operation::GetCart,
            Method::GET,
            "/api/checkout/cart",
            &[],
            auth,
            None,
        )
        .await
    }

    /// Add a product to the cart. The payload (quantity, options) is relayed untouched.
    ///
    /// # Errors
    ///
    /// Returns `BagistoError` on transport, decode, or fault-signature failure.
    pub async fn add_to_cart(
        &self,
        auth: &UpstreamAuth,
        product_id: ProductId,
        payload: &Value,
    ) -> Result<UpstreamResponse, BagistoError> {
        let path = format!("/api/checkout/cart/add/{product_id}");
        self.execute(
            Operation::AddToCart,
            Method::POST,
            &path,
            &[],
            auth,
            Some(payload),
        )
        .await
    }

    /// Remove a line from the cart.
    ///
    /// # Errors
    ///
    /// Returns `BagistoError` on transport, decode, or fault-signature failure.
    pub async fn remove_cart_item(
        &self,
        auth: &UpstreamAuth,
        item_id: CartItemId,
    ) -> Result<UpstreamResponse, BagistoError> {
        let path = format!("/api/checkout/cart/remove-item/{item_id}");
        self.execute(
            Operation::RemoveCartItem,
            Method::GET,
            &path,
            &[],
            auth,
            None,
        )
        .await
    }

    /// Set the quantity of one cart line.
    ///
    /// # Errors
    ///
    /// Returns `BagistoError` on transport, decode, or fault-signature failure.
    pub async fn update_cart(
        &self,
        auth: &UpstreamAuth,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<UpstreamResponse, BagistoError> {
        let payload = update_payload(item_id, quantity);
        self.execute(
            Operation::UpdateCart,
            Method::PATCH,
            "/api/checkout/cart/update",
            &[],
            auth,
            Some(&payload),
        )
        .await
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Run one checkout step. Save-order is sent without a body.
    ///
    /// # Errors
    ///
    /// Returns `BagistoError` on transport, decode, or fault-signature failure.
    pub async fn checkout_step(
        &self,
        step: CheckoutStep,
        auth: &UpstreamAuth,
        payload: Option<&Value>,
    ) -> Result<UpstreamResponse, BagistoError> {
        let payload = match step {
            CheckoutStep::Order => None,
            CheckoutStep::Address | CheckoutStep::Shipping | CheckoutStep::Payment => payload,
        };

        self.execute(step.operation(), Method::POST, step.path(), &[], auth, payload)
            .await
    }

    // =========================================================================
    // Wishlist
    // =========================================================================

    /// Wishlist of the authenticated customer.
    ///
    /// # Errors
    ///
    /// Returns `BagistoError` on transport, decode, or fault-signature failure.
    pub async fn get_wishlist(
        &self,
        auth: &UpstreamAuth,
    ) -> Result<UpstreamResponse, BagistoError> {
        self.execute(
            Operation::GetWishlist,
            Method::GET,
            "/api/customer/wishlist",
            &[],
            auth,
            None,
        )
        .await
    }

    /// Add a product to the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `BagistoError` on transport, decode, or fault-signature failure.
    pub async fn add_to_wishlist(
        &self,
        auth: &UpstreamAuth,
        product_id: ProductId,
    ) -> Result<UpstreamResponse, BagistoError> {
        let payload = json!({ "product_id": product_id });
        self.execute(
            Operation::AddToWishlist,
            Method::POST,
            "/api/customer/wishlist/add",
            &[],
            auth,
            Some(&payload),
        )
        .await
    }

    /// Remove a product from the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `BagistoError` on transport, decode, or fault-signature failure.
    pub async fn remove_from_wishlist(
        &self,
        auth: &UpstreamAuth,
        product_id: ProductId,
    ) -> Result<UpstreamResponse, BagistoError> {
        let path = format!("/api/customer/wishlist/remove/{product_id}");
        self.execute(
            Operation::RemoveFromWishlist,
            Method::DELETE,
            &path,
            &[],
            auth,
            None,
        )
        .await
    }
}

/// Bagisto's cart update body: `{"qty": {"<item id>": <quantity>}}`.
fn update_payload(item_id: CartItemId, quantity: u32) -> Value {
    let mut qty = serde_json::Map::new();
    qty.insert(item_id.to_string(), Value::from(quantity));
    json!({ "qty": qty })
}

fn excerpt(text: &str) -> String {
    text.chars().take(LOG_EXCERPT_CHARS).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use url::Url;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::bagisto::UpstreamFault;

    fn client_for(server: &MockServer) -> BagistoClient {
        let config = BagistoConfig {
            base_url: Url::parse(&server.uri()).unwrap(),
            session_cookie: "bagisto_session".to_string(),
            timeout: None,
        };
        BagistoClient::new(&config).unwrap()
    }

    #[test]
    fn test_update_payload_shape() {
        let payload = update_payload(CartItemId::new(7), 3);
        assert_eq!(payload, json!({ "qty": { "7": 3 } }));
    }

    #[test]
    fn test_excerpt_truncates() {
        let long = "x".repeat(2_000);
        assert_eq!(excerpt(&long).len(), LOG_EXCERPT_CHARS);
        assert_eq!(excerpt("short"), "short");
    }

    #[tokio::test]
    async fn test_login_sends_token_query_and_captures_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/customer/login"))
            .and(query_param("token", "true"))
            .and(header("accept", "application/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "bagisto_session=abc123; path=/; httponly")
                    .set_body_json(json!({ "token": "tok123" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server)
            .login(&json!({ "email": "a@b.com", "password": "secret" }))
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.body, json!({ "token": "tok123" }));
        assert_eq!(response.session.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_session_credential_is_rekeyed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/checkout/cart"))
            .and(header("cookie", "bagisto_session=sess-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
            .expect(1)
            .mount(&server)
            .await;

        let auth = UpstreamAuth::Session("sess-1".to_string());
        let response = client_for(&server).get_cart(&auth).await.unwrap();
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn test_non_json_body_is_invalid_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/checkout/cart"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad gateway</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_cart(&UpstreamAuth::Anonymous)
            .await
            .unwrap_err();

        match err {
            BagistoError::InvalidJson { status, raw, .. } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(raw, "<html>Bad gateway</html>");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_body_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/customer/wishlist/remove/5"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let response = client_for(&server)
            .remove_from_wishlist(&UpstreamAuth::Bearer("t".to_string()), ProductId::new(5))
            .await
            .unwrap();
        assert_eq!(response.body, Value::Null);
    }

    #[tokio::test]
    async fn test_fault_signature_on_http_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/checkout/cart/add/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": { "message": "Trying to get property 'status' of non-object" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .add_to_cart(
                &UpstreamAuth::Bearer("tok".to_string()),
                ProductId::new(42),
                &json!({ "quantity": 1 }),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BagistoError::Fault {
                operation: Operation::AddToCart,
                fault: UpstreamFault::MalformedPayload,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_update_cart_forwards_qty_map() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/checkout/cart/update"))
            .and(body_json(json!({ "qty": { "11": 2 } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
            .expect(1)
            .mount(&server)
            .await;

        let auth = UpstreamAuth::Bearer("tok".to_string());
        client_for(&server)
            .update_cart(&auth, CartItemId::new(11), 2)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_product_slug_is_percent_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products/slug/kiondo%20bag"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": 1 } })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .get_product(&UpstreamAuth::Anonymous, "kiondo bag")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_categories_are_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/categories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let first = client.list_categories(&UpstreamAuth::Anonymous).await.unwrap();
        let second = client.list_categories(&UpstreamAuth::Anonymous).await.unwrap();
        assert_eq!(first.body, second.body);
    }

    #[tokio::test]
    async fn test_failed_categories_are_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/categories"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "down" })))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        for _ in 0..2 {
            let response = client.list_categories(&UpstreamAuth::Anonymous).await.unwrap();
            assert!(!response.is_success());
        }
    }
}
