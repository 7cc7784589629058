//! Liveness and readiness probes.

use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Checks the credential store when one is configured; without one the
/// gateway only depends on Bagisto, which is not probed.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Some(pool) = state.pool() else {
        return StatusCode::OK;
    };

    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Credential store not reachable");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;
    use wiremock::MockServer;

    use super::*;
    use crate::routes::test_support::app_for;

    #[tokio::test]
    async fn test_health_probes_without_store() {
        let server = MockServer::start().await;

        for uri in ["/health", "/health/ready"] {
            let response = app_for(&server)
                .oneshot(
                    Request::builder()
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap_or_else(|e| panic!("request: {e}")),
                )
                .await
                .unwrap_or_else(|e| match e {});
            assert_eq!(response.status(), StatusCode::OK, "{uri}");

            if uri == "/health" {
                let bytes = to_bytes(response.into_body(), 16)
                    .await
                    .unwrap_or_else(|e| panic!("body: {e}"));
                assert_eq!(&bytes[..], b"ok");
            }
        }
    }
}
