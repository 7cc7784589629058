//! Orchestrated checkout.
//!
//! Bagisto exposes checkout as four independent calls (address, shipping,
//! payment method, order). This service issues them strictly in order with
//! one credential and stops at the first failure, so the caller always knows
//! which steps persisted. Bagisto has no compensating calls, so nothing is
//! undone: later steps are simply never sent.
//!
//! Once the order is saved, an `IntaSend` checkout session is created when
//! payments are configured and the customer supplied contact details.

use axum::http::StatusCode;
use dukasasa_core::{OrderId, Price};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::bagisto::{
    BagistoClient, BagistoError, CheckoutStep, Operation, UpstreamAuth, UpstreamResponse,
};
use crate::services::intasend::{CheckoutSession, IntaSendClient, PaymentCustomer, PaymentError};

/// Shipping method kept as-is; anything else falls back to free shipping.
pub const FLAT_RATE_SHIPPING: &str = "flatrate_flatrate";
/// Fallback shipping method.
pub const FREE_SHIPPING: &str = "free_free";
/// Payment method used when the client does not name one.
pub const DEFAULT_PAYMENT_METHOD: &str = "intasendcardmobilemoney";

/// Checkout request body.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    /// Bagisto save-address body (`billing`, `shipping`), relayed untouched.
    pub address: Value,
    #[serde(default)]
    pub shipping_method: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Contact details for the payment page.
    #[serde(default)]
    pub customer: Option<PaymentCustomer>,
}

impl CheckoutRequest {
    fn shipping_payload(&self) -> Value {
        json!({ "shipping_method": normalise_shipping(self.shipping_method.as_deref()) })
    }

    fn payment_payload(&self) -> Value {
        let method = self
            .payment_method
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_PAYMENT_METHOD);
        json!({ "payment": { "method": method } })
    }
}

/// Map the requested shipping method onto the two Bagisto carriers in use.
#[must_use]
pub fn normalise_shipping(method: Option<&str>) -> &'static str {
    match method.map(str::trim) {
        Some(FLAT_RATE_SHIPPING) => FLAT_RATE_SHIPPING,
        _ => FREE_SHIPPING,
    }
}

/// One stage of the checkout sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStage {
    SaveAddress,
    SaveShipping,
    SavePayment,
    SaveOrder,
    /// `IntaSend` checkout session creation.
    CreatePayment,
}

impl CheckoutStage {
    /// The Bagisto call behind this stage; `None` for the payment session.
    #[must_use]
    pub const fn step(self) -> Option<CheckoutStep> {
        match self {
            Self::SaveAddress => Some(CheckoutStep::Address),
            Self::SaveShipping => Some(CheckoutStep::Shipping),
            Self::SavePayment => Some(CheckoutStep::Payment),
            Self::SaveOrder => Some(CheckoutStep::Order),
            Self::CreatePayment => None,
        }
    }

    /// The upstream operation behind this stage.
    #[must_use]
    pub const fn operation(self) -> Option<Operation> {
        match self.step() {
            Some(step) => Some(step.operation()),
            None => None,
        }
    }
}

impl From<CheckoutStep> for CheckoutStage {
    fn from(step: CheckoutStep) -> Self {
        match step {
            CheckoutStep::Address => Self::SaveAddress,
            CheckoutStep::Shipping => Self::SaveShipping,
            CheckoutStep::Payment => Self::SavePayment,
            CheckoutStep::Order => Self::SaveOrder,
        }
    }
}

/// Why a stage failed.
#[derive(Debug)]
pub enum FailureCause {
    /// Transport, decode, or fault-signature failure.
    Upstream(BagistoError),
    /// Bagisto answered with a non-2xx status.
    Rejected { status: StatusCode, body: Value },
    /// `IntaSend` refused or could not be reached.
    Payment(PaymentError),
    /// The saved order carried no usable id or total.
    MissingOrderDetails,
}

/// The stage that stopped the checkout.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: CheckoutStage,
    pub cause: FailureCause,
}

/// A saved order.
#[derive(Debug)]
pub struct PlacedOrder {
    pub status: StatusCode,
    /// Save-order response body.
    pub order: Value,
    pub payment: Option<CheckoutSession>,
}

/// Result of a checkout run.
#[derive(Debug)]
pub struct CheckoutReport {
    /// Stages that completed, in order.
    pub completed_steps: Vec<CheckoutStage>,
    pub outcome: Result<PlacedOrder, StageFailure>,
    /// Latest session token issued by Bagisto during the run.
    pub session: Option<String>,
}

/// Credential and completed stages carried from one stage to the next.
struct Progress {
    auth: UpstreamAuth,
    completed: Vec<CheckoutStage>,
    session: Option<String>,
}

impl Progress {
    fn new(auth: &UpstreamAuth) -> Self {
        Self {
            auth: auth.clone(),
            completed: Vec::with_capacity(5),
            session: None,
        }
    }

    /// Follow a session rotated by any upstream answer, accepted or not.
    fn observe(&mut self, upstream: &UpstreamResponse) {
        if let Some(token) = &upstream.session {
            self.auth = self.auth.clone().with_session(token.clone());
            self.session = Some(token.clone());
        }
    }

    fn finish(self, outcome: Result<PlacedOrder, StageFailure>) -> CheckoutReport {
        CheckoutReport {
            completed_steps: self.completed,
            outcome,
            session: self.session,
        }
    }

    fn fail(self, stage: CheckoutStage, cause: FailureCause) -> CheckoutReport {
        warn!(stage = ?stage, completed = self.completed.len(), "Checkout aborted");
        self.finish(Err(StageFailure { stage, cause }))
    }
}

/// Runs the checkout sequence against Bagisto and, optionally, `IntaSend`.
pub struct CheckoutOrchestrator<'a> {
    bagisto: &'a BagistoClient,
    intasend: Option<&'a IntaSendClient>,
}

impl<'a> CheckoutOrchestrator<'a> {
    #[must_use]
    pub const fn new(bagisto: &'a BagistoClient, intasend: Option<&'a IntaSendClient>) -> Self {
        Self { bagisto, intasend }
    }

    /// Run every stage in order, stopping at the first failure.
    #[instrument(skip(self, auth, request), fields(auth = auth.kind()))]
    pub async fn run(&self, auth: &UpstreamAuth, request: &CheckoutRequest) -> CheckoutReport {
        let mut progress = Progress::new(auth);
        let shipping = request.shipping_payload();
        let payment_method = request.payment_payload();

        for (step, payload) in [
            (CheckoutStep::Address, &request.address),
            (CheckoutStep::Shipping, &shipping),
            (CheckoutStep::Payment, &payment_method),
        ] {
            if let Err(cause) = self.advance(&mut progress, step, Some(payload)).await {
                return progress.fail(step.into(), cause);
            }
        }

        let order = match self.advance(&mut progress, CheckoutStep::Order, None).await {
            Ok(order) => order,
            Err(cause) => return progress.fail(CheckoutStage::SaveOrder, cause),
        };

        let payment = match self.create_payment(request, &order.body).await {
            Ok(session) => session,
            Err(cause) => return progress.fail(CheckoutStage::CreatePayment, cause),
        };
        if payment.is_some() {
            progress.completed.push(CheckoutStage::CreatePayment);
        }

        info!(steps = progress.completed.len(), "Checkout completed");
        progress.finish(Ok(PlacedOrder {
            status: order.status,
            order: order.body,
            payment,
        }))
    }

    /// Run one Bagisto stage; non-2xx answers count as failures.
    async fn advance(
        &self,
        progress: &mut Progress,
        step: CheckoutStep,
        payload: Option<&Value>,
    ) -> Result<UpstreamResponse, FailureCause> {
        let upstream = self
            .bagisto
            .checkout_step(step, &progress.auth, payload)
            .await
            .map_err(FailureCause::Upstream)?;

        progress.observe(&upstream);
        if !upstream.is_success() {
            return Err(FailureCause::Rejected {
                status: upstream.status,
                body: upstream.body,
            });
        }

        progress.completed.push(step.into());
        Ok(upstream)
    }

    /// Create the `IntaSend` session for a saved order. Skipped (`Ok(None)`)
    /// when payments are not configured or no customer details were sent.
    async fn create_payment(
        &self,
        request: &CheckoutRequest,
        order: &Value,
    ) -> Result<Option<CheckoutSession>, FailureCause> {
        let (Some(intasend), Some(customer)) = (self.intasend, request.customer.as_ref()) else {
            return Ok(None);
        };

        let (order_id, amount) =
            order_details(order, intasend).ok_or(FailureCause::MissingOrderDetails)?;

        intasend
            .create_checkout(customer, &amount, order_id)
            .await
            .map(Some)
            .map_err(FailureCause::Payment)
    }
}

/// Order id and total from a save-order body.
///
/// Bagisto answers either `{data: {id, grand_total}}` or
/// `{data: {order: {id, grand_total}}}` depending on the payment method.
fn order_details(order: &Value, intasend: &IntaSendClient) -> Option<(OrderId, Price)> {
    let data = order.get("data")?;
    let record = data.get("order").filter(|o| o.is_object()).unwrap_or(data);

    let id = serde_json::from_value::<OrderId>(record.get("id")?.clone()).ok()?;
    let amount = Price::from_json(record.get("grand_total")?, intasend.currency()).ok()?;
    Some((id, amount))
}
