//! Orchestrated checkout handler.

use axum::{extract::State, http::StatusCode};
use serde_json::{Map, Value, json};
use tracing::instrument;

use crate::error::{AppError, Failure, add_breadcrumb};
use crate::middleware::UpstreamCredentials;
use crate::routes::ProxyReply;
use crate::routes::extract::JsonBody;
use crate::services::checkout::{
    CheckoutOrchestrator, CheckoutReport, CheckoutRequest, FailureCause, StageFailure,
};
use crate::state::AppState;

/// Run address, shipping, payment, and order in sequence.
///
/// The reply always lists `completed_steps`. On failure it also names the
/// `failed_step` and carries that step's status and payload.
#[instrument(skip(state, auth, request))]
pub async fn checkout(
    State(state): State<AppState>,
    UpstreamCredentials(auth): UpstreamCredentials,
    JsonBody(request): JsonBody<CheckoutRequest>,
) -> ProxyReply {
    let report = CheckoutOrchestrator::new(state.bagisto(), state.intasend())
        .run(&auth, &request)
        .await;

    render(&state, report)
}

fn render(state: &AppState, report: CheckoutReport) -> ProxyReply {
    let mut body = Map::new();
    body.insert(
        "completed_steps".to_string(),
        json!(report.completed_steps),
    );

    let status = match report.outcome {
        Ok(placed) => {
            add_breadcrumb("checkout", "Order placed", None);
            body.insert("success".to_string(), Value::Bool(true));
            body.insert("order".to_string(), placed.order);
            if let Some(payment) = placed.payment {
                body.insert("redirect_url".to_string(), Value::from(payment.redirect_url));
            }
            placed.status
        }
        Err(failure) => {
            let stage = failure.stage;
            let (status, failure) = describe(failure);
            body.insert("success".to_string(), Value::Bool(false));
            body.insert("failed_step".to_string(), json!(stage));
            body.insert("message".to_string(), Value::from(failure.message));
            if let Some(error) = failure.error {
                body.insert("error".to_string(), error);
            }
            if let Some(raw) = failure.raw {
                body.insert("raw".to_string(), Value::from(raw));
            }
            status
        }
    };

    ProxyReply::new(status, Value::Object(body)).with_session(state.config(), report.session)
}

/// Status and envelope for the stage that stopped the checkout.
fn describe(failure: StageFailure) -> (StatusCode, Failure) {
    let StageFailure { stage, cause } = failure;
    let error = match cause {
        FailureCause::Rejected { status, body } => {
            let message = stage
                .operation()
                .map_or("Checkout failed.", |op| op.failure_message());
            return (status, Failure::message(message).with_error(body));
        }
        FailureCause::MissingOrderDetails => {
            return (
                StatusCode::BAD_GATEWAY,
                Failure::message("Missing order ID or amount"),
            );
        }
        FailureCause::Upstream(err) => AppError::Upstream(err),
        FailureCause::Payment(err) => AppError::Payment(err),
    };

    if error.is_server_error() {
        tracing::error!(error = %error, stage = ?stage, "Checkout stage failed");
    }
    error.to_failure()
}
