//! Customer authentication handlers.
//!
//! Login and registration are relayed to Bagisto verbatim; the direct
//! credential check runs against the local store.

use axum::{Json, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::Principal;
use crate::routes::ProxyReply;
use crate::routes::extract::JsonBody;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

/// Registration payload as sent by the storefront frontend.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub lastname: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    /// Bagisto's registration body. Bagisto insists on a confirmation field.
    fn to_upstream(&self) -> Value {
        json!({
            "first_name": self.name,
            "last_name": self.lastname,
            "email": self.email,
            "password": self.password,
            "password_confirmation": self.password,
        })
    }
}

/// Credential check payload.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Credential check response.
#[derive(Debug, Serialize)]
pub struct CredentialsResponse {
    pub success: bool,
    pub principal: Principal,
}

/// Relay a login to Bagisto. The upstream body (with its token) is returned as-is.
#[instrument(skip(state, credentials))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(credentials): JsonBody<Value>,
) -> Result<ProxyReply> {
    let upstream = state.bagisto().login(&credentials).await?;

    if upstream.is_success() {
        add_breadcrumb("auth", "Customer logged in", None);
    }

    let body = upstream.body.clone();
    Ok(ProxyReply::relay(&state, upstream, body))
}

/// Relay a registration to Bagisto and keep a local credential copy.
#[instrument(skip(state, request))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<ProxyReply> {
    let upstream = state.bagisto().register(&request.to_upstream()).await?;

    if upstream.is_success() {
        store_credential_copy(&state, &request).await;
    }

    let body = upstream.body.clone();
    Ok(ProxyReply::relay(&state, upstream, body))
}

/// Store the registered credential locally. Failures are logged only: the
/// Bagisto account already exists at this point.
async fn store_credential_copy(state: &AppState, request: &RegisterRequest) {
    let Some(pool) = state.pool() else {
        return;
    };

    match AuthService::new(pool)
        .register_with_password(&request.email, &request.password)
        .await
    {
        Ok(record) => info!(credential_id = %record.id, "Stored local credential copy"),
        Err(AuthError::UserAlreadyExists) => {
            info!("Local credential copy already present");
        }
        Err(e) => warn!(error = %e, "Failed to store local credential copy"),
    }
}

/// Check an email and password against the local credential store.
#[instrument(skip(state, request))]
pub async fn credentials(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CredentialsRequest>,
) -> Result<impl IntoResponse> {
    let pool = state.pool().ok_or(AppError::Auth(AuthError::Disabled))?;

    let principal = AuthService::new(pool)
        .login_with_password(&request.email, &request.password)
        .await?;

    Ok(Json(CredentialsResponse {
        success: true,
        principal,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::routes::test_support::{app_for, json_request, send};

    #[test]
    fn test_register_maps_field_names() {
        let request = RegisterRequest {
            name: "Juma".to_string(),
            lastname: "Mwangi".to_string(),
            email: "juma@example.co.ke".to_string(),
            password: "karibu-sana".to_string(),
        };
        assert_eq!(
            request.to_upstream(),
            json!({
                "first_name": "Juma",
                "last_name": "Mwangi",
                "email": "juma@example.co.ke",
                "password": "karibu-sana",
                "password_confirmation": "karibu-sana"
            })
        );
    }

    #[tokio::test]
    async fn test_login_relays_upstream_body_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/customer/login"))
            .and(query_param("token", "true"))
            .and(body_json(json!({ "email": "a@b.com", "password": "secret" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok123" })))
            .expect(1)
            .mount(&server)
            .await;

        let (response, body) = send(
            app_for(&server),
            json_request(
                "POST",
                "/api/proxy/login",
                &json!({ "email": "a@b.com", "password": "secret" }),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body, json!({ "token": "tok123" }));
    }

    #[tokio::test]
    async fn test_login_rejection_keeps_upstream_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/customer/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid Email or Password" })),
            )
            .mount(&server)
            .await;

        let (response, body) = send(
            app_for(&server),
            json_request("POST", "/api/proxy/login", &json!({ "email": "a@b.com", "password": "x" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid Email or Password");
    }

    #[tokio::test]
    async fn test_register_missing_field_is_bad_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (response, body) = send(
            app_for(&server),
            json_request("POST", "/api/proxy/register", &json!({ "email": "a@b.com" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_credentials_without_store_is_unavailable() {
        let server = MockServer::start().await;

        let (response, body) = send(
            app_for(&server),
            json_request(
                "POST",
                "/api/auth/credentials",
                &json!({ "email": "a@b.com", "password": "secret123" }),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
    }
}
