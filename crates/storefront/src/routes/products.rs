//! Catalog route handlers.

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::instrument;

use crate::bagisto::Operation;
use crate::error::Result;
use crate::middleware::UpstreamCredentials;
use crate::routes::ProxyReply;
use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 20;
const DEFAULT_PAGE: u32 = 1;

/// Pagination fields kept from Bagisto's search `meta`.
const SEARCH_META_FIELDS: [&str; 6] = [
    "current_page",
    "last_page",
    "per_page",
    "total",
    "from",
    "to",
];

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: String,
    pub page: Option<u32>,
}

fn field(body: &Value, key: &str) -> Value {
    body.get(key).cloned().unwrap_or(Value::Null)
}

/// Keep only the pagination fields clients use; absent fields become null.
fn search_meta(meta: &Value) -> Value {
    let picked: Map<String, Value> = SEARCH_META_FIELDS
        .iter()
        .map(|key| ((*key).to_string(), field(meta, key)))
        .collect();
    Value::Object(picked)
}

/// One page of products.
#[instrument(skip(state, auth))]
pub async fn index(
    State(state): State<AppState>,
    UpstreamCredentials(auth): UpstreamCredentials,
    Query(query): Query<PaginationQuery>,
) -> Result<ProxyReply> {
    let limit = query.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT);
    let page = query.page.filter(|p| *p > 0).unwrap_or(DEFAULT_PAGE);

    let upstream = state.bagisto().list_products(&auth, limit, page).await?;

    if !upstream.is_success() {
        return Ok(ProxyReply::envelope(
            &state,
            Operation::ListProducts,
            upstream,
            "products",
            |body| body,
        ));
    }

    let body = json!({
        "success": true,
        "products": field(&upstream.body, "data"),
        "meta": field(&upstream.body, "meta"),
    });
    Ok(ProxyReply::relay(&state, upstream, body))
}

/// Product detail by URL key.
#[instrument(skip(state, auth))]
pub async fn show(
    State(state): State<AppState>,
    UpstreamCredentials(auth): UpstreamCredentials,
    Path(slug): Path<String>,
) -> Result<ProxyReply> {
    let upstream = state.bagisto().get_product(&auth, &slug).await?;

    let body = if upstream.is_success() {
        json!({ "success": true, "data": field(&upstream.body, "data") })
    } else {
        json!({ "success": false, "error": "Product not found" })
    };
    Ok(ProxyReply::relay(&state, upstream, body))
}

/// Product search, paginated.
#[instrument(skip(state, auth))]
pub async fn search(
    State(state): State<AppState>,
    UpstreamCredentials(auth): UpstreamCredentials,
    Query(query): Query<SearchQuery>,
) -> Result<ProxyReply> {
    let page = query.page.filter(|p| *p > 0).unwrap_or(DEFAULT_PAGE);
    let upstream = state
        .bagisto()
        .search_products(&auth, query.search.trim(), page)
        .await?;

    if !upstream.is_success() {
        return Ok(ProxyReply::envelope(
            &state,
            Operation::SearchProducts,
            upstream,
            "products",
            |body| body,
        ));
    }

    let body = json!({
        "success": true,
        "products": field(&upstream.body, "data"),
        "meta": search_meta(&field(&upstream.body, "meta")),
    });
    Ok(ProxyReply::relay(&state, upstream, body))
}

/// Category tree.
#[instrument(skip(state, auth))]
pub async fn categories(
    State(state): State<AppState>,
    UpstreamCredentials(auth): UpstreamCredentials,
) -> Result<ProxyReply> {
    let upstream = state.bagisto().list_categories(&auth).await?;
    Ok(ProxyReply::envelope(
        &state,
        Operation::ListCategories,
        upstream,
        "data",
        |body| field(&body, "data"),
    ))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use axum::http::StatusCode;

    use super::*;
    use crate::routes::test_support::{app_for, get, send};

    #[test]
    fn test_search_meta_picks_pagination_fields() {
        let meta = json!({
            "current_page": 2,
            "last_page": 5,
            "per_page": 10,
            "total": 48,
            "from": 11,
            "to": 20,
            "links": [{ "url": null }],
            "path": "https://shop/api/products"
        });
        assert_eq!(
            search_meta(&meta),
            json!({
                "current_page": 2,
                "last_page": 5,
                "per_page": 10,
                "total": 48,
                "from": 11,
                "to": 20
            })
        );
    }

    #[tokio::test]
    async fn test_index_uses_default_pagination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .and(query_param("limit", "20"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "id": 1, "name": "Kikoi" }],
                "meta": { "total": 1 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (response, body) = send(app_for(&server), get("/api/proxy/products")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["products"][0]["name"], "Kikoi");
        assert_eq!(body["meta"]["total"], 1);
    }

    #[tokio::test]
    async fn test_show_not_found_keeps_upstream_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products/slug/no-such-thing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not found" })))
            .mount(&server)
            .await;

        let (response, body) =
            send(app_for(&server), get("/api/proxy/products/no-such-thing")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "success": false, "error": "Product not found" }));
    }

    #[tokio::test]
    async fn test_search_forwards_term_and_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .and(query_param("search", "sufuria"))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [],
                "meta": { "current_page": 3, "last_page": 3 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (response, body) = send(
            app_for(&server),
            get("/api/proxy/search?search=sufuria&page=3"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body["meta"]["current_page"], 3);
        assert_eq!(body["meta"]["total"], Value::Null);
    }

    #[tokio::test]
    async fn test_categories_wrapped_in_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/categories"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "slug": "jikoni" }] })),
            )
            .mount(&server)
            .await;

        let (_, body) = send(app_for(&server), get("/api/proxy/categories")).await;

        assert_eq!(body, json!({ "success": true, "data": [{ "slug": "jikoni" }] }));
    }
}
