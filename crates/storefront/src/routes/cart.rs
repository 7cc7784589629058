//! Cart route handlers.
//!
//! Bagisto keys the cart to its session, so mutations carry the client's
//! session cookie (or bearer token) upstream and relay any refreshed token.

use axum::extract::{Path, State};
use dukasasa_core::{CartItemId, ProductId};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::bagisto::{CheckoutStep, Operation, UpstreamAuth};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::UpstreamCredentials;
use crate::routes::ProxyReply;
use crate::routes::extract::JsonBody;
use crate::state::AppState;

/// Body of `DELETE /cart`.
#[derive(Debug, Deserialize)]
pub struct RemoveItemRequest {
    pub item_id: Option<CartItemId>,
}

/// Body of `PATCH /cart`.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub item_id: Option<CartItemId>,
    pub quantity: Option<u32>,
}

/// Parse a product id path segment.
pub(crate) fn product_id(raw: &str) -> Result<ProductId> {
    raw.parse()
        .map_err(|e| AppError::BadRequest(format!("Invalid product id: {e}")))
}

/// Current cart.
#[instrument(skip(state, auth))]
pub async fn show(
    State(state): State<AppState>,
    UpstreamCredentials(auth): UpstreamCredentials,
) -> Result<ProxyReply> {
    let upstream = state.bagisto().get_cart(&auth).await?;
    Ok(ProxyReply::envelope(
        &state,
        Operation::GetCart,
        upstream,
        "cart",
        |body| body,
    ))
}

/// Add a product to the cart. The request body is relayed as the item payload.
#[instrument(skip(state, auth, payload))]
pub async fn add(
    State(state): State<AppState>,
    UpstreamCredentials(auth): UpstreamCredentials,
    Path(raw_id): Path<String>,
    JsonBody(payload): JsonBody<Value>,
) -> Result<ProxyReply> {
    let product_id = product_id(&raw_id)?;
    let upstream = state
        .bagisto()
        .add_to_cart(&auth, product_id, &payload)
        .await?;

    if upstream.is_success() {
        let id = product_id.to_string();
        add_breadcrumb("cart", "Added to cart", Some(&[("product_id", id.as_str())]));
    }

    let body = json!({ "success": upstream.is_success(), "data": upstream.body });
    Ok(ProxyReply::relay(&state, upstream, body))
}

/// Remove one cart line.
#[instrument(skip(state, auth, request))]
pub async fn remove(
    State(state): State<AppState>,
    UpstreamCredentials(auth): UpstreamCredentials,
    JsonBody(request): JsonBody<RemoveItemRequest>,
) -> Result<ProxyReply> {
    let item_id = match (auth.is_present(), request.item_id) {
        (true, Some(item_id)) => item_id,
        _ => return Err(AppError::BadRequest("Missing session or item_id.".to_string())),
    };

    let upstream = state.bagisto().remove_cart_item(&auth, item_id).await?;
    Ok(ProxyReply::envelope(
        &state,
        Operation::RemoveCartItem,
        upstream,
        "result",
        |body| body,
    ))
}

/// Set the quantity of one cart line.
#[instrument(skip(state, auth, request))]
pub async fn update(
    State(state): State<AppState>,
    UpstreamCredentials(auth): UpstreamCredentials,
    JsonBody(request): JsonBody<UpdateItemRequest>,
) -> Result<ProxyReply> {
    let (item_id, quantity) = match (auth.is_present(), request.item_id, request.quantity) {
        (true, Some(item_id), Some(quantity)) if quantity >= 1 => (item_id, quantity),
        _ => {
            return Err(AppError::BadRequest(
                "Missing session, item_id, or quantity.".to_string(),
            ));
        }
    };

    let upstream = state
        .bagisto()
        .update_cart(&auth, item_id, quantity)
        .await?;
    Ok(ProxyReply::envelope(
        &state,
        Operation::UpdateCart,
        upstream,
        "cart",
        |body| body,
    ))
}

/// Run one checkout step and wrap the answer as `{success, data}`.
async fn step(
    state: &AppState,
    checkout_step: CheckoutStep,
    auth: &UpstreamAuth,
    payload: Option<&Value>,
) -> Result<ProxyReply> {
    let upstream = state
        .bagisto()
        .checkout_step(checkout_step, auth, payload)
        .await?;
    Ok(ProxyReply::envelope(
        state,
        checkout_step.operation(),
        upstream,
        "data",
        |body| body,
    ))
}

/// Save billing and shipping addresses.
#[instrument(skip(state, auth, payload))]
pub async fn save_address(
    State(state): State<AppState>,
    UpstreamCredentials(auth): UpstreamCredentials,
    JsonBody(payload): JsonBody<Value>,
) -> Result<ProxyReply> {
    step(&state, CheckoutStep::Address, &auth, Some(&payload)).await
}

/// Choose the shipping method.
#[instrument(skip(state, auth, payload))]
pub async fn save_shipping(
    State(state): State<AppState>,
    UpstreamCredentials(auth): UpstreamCredentials,
    JsonBody(payload): JsonBody<Value>,
) -> Result<ProxyReply> {
    step(&state, CheckoutStep::Shipping, &auth, Some(&payload)).await
}

/// Choose the payment method.
#[instrument(skip(state, auth, payload))]
pub async fn save_payment(
    State(state): State<AppState>,
    UpstreamCredentials(auth): UpstreamCredentials,
    JsonBody(payload): JsonBody<Value>,
) -> Result<ProxyReply> {
    step(&state, CheckoutStep::Payment, &auth, Some(&payload)).await
}

/// Place the order for the current cart.
#[instrument(skip(state, auth))]
pub async fn place_order(
    State(state): State<AppState>,
    UpstreamCredentials(auth): UpstreamCredentials,
) -> Result<ProxyReply> {
    step(&state, CheckoutStep::Order, &auth, None).await
}

#[cfg(test)]
mod tests {
    use axum::http::{StatusCode, header::SET_COOKIE};
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::routes::test_support::{app_for, get, json_request, send};

    fn with_cookie(
        mut request: axum::http::Request<axum::body::Body>,
        cookie: &'static str,
    ) -> axum::http::Request<axum::body::Body> {
        request.headers_mut().insert(
            axum::http::header::COOKIE,
            axum::http::HeaderValue::from_static(cookie),
        );
        request
    }

    #[tokio::test]
    async fn test_show_rekeys_session_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/checkout/cart"))
            .and(header("cookie", "bagisto_session=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "items_count": 2 } })))
            .expect(1)
            .mount(&server)
            .await;

        let (response, body) = send(
            app_for(&server),
            with_cookie(get("/api/proxy/cart"), "bagisto-session=abc"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["cart"]["data"]["items_count"], 2);
    }

    #[tokio::test]
    async fn test_show_failure_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/checkout/cart"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Unauthenticated." })))
            .mount(&server)
            .await;

        let (response, body) = send(app_for(&server), get("/api/proxy/cart")).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Failed to fetch cart.");
        assert_eq!(body["error"]["message"], "Unauthenticated.");
    }

    #[tokio::test]
    async fn test_add_relays_session_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/checkout/cart/add/42"))
            .and(body_json(json!({ "quantity": 1 })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "bagisto_session=fresh; path=/; httponly")
                    .set_body_json(json!({ "message": "Item added" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (response, body) = send(
            app_for(&server),
            json_request("POST", "/api/proxy/cart/add/42", &json!({ "quantity": 1 })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "data": { "message": "Item added" } }));
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(cookie.starts_with("bagisto-session=fresh"));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn test_add_rejects_bad_product_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (response, body) = send(
            app_for(&server),
            json_request("POST", "/api/proxy/cart/add/abc", &json!({ "quantity": 1 })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_update_sends_quantity_map() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/checkout/cart/update"))
            .and(body_json(json!({ "qty": { "7": 3 } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
            .expect(1)
            .mount(&server)
            .await;

        let (response, body) = send(
            app_for(&server),
            with_cookie(
                json_request("PATCH", "/api/proxy/cart", &json!({ "item_id": 7, "quantity": 3 })),
                "bagisto-session=abc",
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn test_update_missing_input_never_reaches_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        for body in [
            json!({ "quantity": 2 }),
            json!({ "item_id": 7 }),
            json!({ "item_id": 7, "quantity": 0 }),
        ] {
            let (response, reply) = send(
                app_for(&server),
                with_cookie(
                    json_request("PATCH", "/api/proxy/cart", &body),
                    "bagisto-session=abc",
                ),
            )
            .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(reply["message"], "Missing session, item_id, or quantity.");
        }
    }

    #[tokio::test]
    async fn test_remove_requires_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (response, body) = send(
            app_for(&server),
            json_request("DELETE", "/api/proxy/cart", &json!({ "item_id": 7 })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing session or item_id.");
    }

    #[tokio::test]
    async fn test_remove_uses_get_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/checkout/cart/remove-item/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "removed" })))
            .expect(1)
            .mount(&server)
            .await;

        let (_, body) = send(
            app_for(&server),
            with_cookie(
                json_request("DELETE", "/api/proxy/cart", &json!({ "item_id": "7" })),
                "bagisto-session=abc",
            ),
        )
        .await;

        assert_eq!(body, json!({ "success": true, "result": { "message": "removed" } }));
    }

    #[tokio::test]
    async fn test_place_order_sends_no_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/checkout/save-order"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": 9 } })))
            .expect(1)
            .mount(&server)
            .await;

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/proxy/cart/checkout")
            .body(axum::body::Body::empty())
            .unwrap_or_else(|e| panic!("request: {e}"));
        let (response, body) = send(app_for(&server), request).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body["data"]["data"]["id"], 9);
        let received = server.received_requests().await.unwrap_or_default();
        assert!(received.iter().all(|r| r.body.is_empty()));
    }
}
