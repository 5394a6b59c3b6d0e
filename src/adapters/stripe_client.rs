use {
    crate::domain::{
        cancellation::{Cancellation, CancellationStatus, CancelPaymentRequest, CancelPaymentResponse},
        client::{ClientFuture, PaymentClient},
        error::ProviderError,
        id::{CancellationId, PaymentId},
        money::{Currency, Money, MoneyAmount},
        payment::{Payment, PaymentStatus},
    },
    chrono::{DateTime, Utc},
    std::collections::HashMap,
};

const REFUND_PAGE_LIMIT: u64 = 100;

/// Refund metadata key carrying the caller's free-text reason.
pub const CANCEL_REASON_KEY: &str = "cancel_reason";

/// [`PaymentClient`] over Stripe PaymentIntents. A cancellation is a refund
/// against the intent.
pub struct StripePaymentClient {
    client: stripe::Client,
}

impl StripePaymentClient {
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: stripe::Client::new(secret_key),
        }
    }

    /// Reads `STRIPE_SECRET_KEY`, loading `.env` first if present.
    pub fn from_env() -> Result<Self, ProviderError> {
        dotenvy::dotenv().ok();
        let key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| ProviderError::Validation("STRIPE_SECRET_KEY must be set".into()))?;
        Ok(Self::new(&key))
    }
}

impl PaymentClient for StripePaymentClient {
    fn get_payment(&self, id: &PaymentId) -> ClientFuture<'_, Payment> {
        let id = id.clone();
        Box::pin(async move { self.get_payment_inner(&id).await })
    }

    fn cancel_payment(&self, request: &CancelPaymentRequest) -> ClientFuture<'_, CancelPaymentResponse> {
        let request = request.clone();
        Box::pin(async move { self.cancel_payment_inner(&request).await })
    }
}

impl StripePaymentClient {
    async fn get_payment_inner(&self, id: &PaymentId) -> Result<Payment, ProviderError> {
        let pi_id = parse_intent_id(id)?;
        let pi = self.retrieve_intent(id, &pi_id).await?;
        let refunded = self.refunded_total(id, &pi_id).await?;

        let currency = convert_currency(pi.currency)?;
        let (received, _) = captured_balance(pi.amount_received, refunded)?;
        let status = convert_pi_status(pi.status, received, refunded);
        let metadata = serde_json::to_value(&pi.metadata)
            .map_err(|e| ProviderError::Transport(format!("metadata: {e}")))?;

        Ok(Payment::new(
            id.clone(),
            status,
            Money::new(received, currency),
            refunded,
            metadata,
            timestamp(pi.created),
        ))
    }

    async fn cancel_payment_inner(
        &self,
        request: &CancelPaymentRequest,
    ) -> Result<CancelPaymentResponse, ProviderError> {
        let id = request.payment_id();
        let pi_id = parse_intent_id(id)?;
        let pi = self.retrieve_intent(id, &pi_id).await?;

        if pi.status != stripe::PaymentIntentStatus::Succeeded {
            return Err(ProviderError::NotCancellable(format!(
                "{id} has status {:?}",
                pi.status
            )));
        }

        let refunded = self.refunded_total(id, &pi_id).await?;
        let (_, cancellable) = captured_balance(pi.amount_received, refunded)?;

        if let Some(expected) = request.current_cancellable_amount()
            && expected != cancellable
        {
            return Err(ProviderError::CancellableAmountMismatch {
                expected,
                actual: cancellable,
            });
        }

        let amount = request.amount().unwrap_or(cancellable);
        if amount == MoneyAmount::ZERO || amount > cancellable {
            return Err(ProviderError::NotCancellable(format!(
                "{id}: requested {amount}, cancellable {cancellable}"
            )));
        }

        let mut metadata = HashMap::new();
        metadata.insert(CANCEL_REASON_KEY.to_string(), request.reason().to_string());

        let mut params = stripe::CreateRefund::new();
        params.payment_intent = Some(pi_id);
        params.amount = Some(amount.minor_units());
        params.metadata = Some(metadata);

        let refund = stripe::Refund::create(&self.client, params)
            .await
            .map_err(|e| map_stripe_error(id, e))?;

        Ok(CancelPaymentResponse {
            cancellation: Cancellation {
                id: CancellationId::new(refund.id.to_string())?,
                status: convert_refund_status(refund.status.as_deref()),
                amount: MoneyAmount::new(refund.amount)?,
                reason: request.reason().to_string(),
                requested_at: timestamp(refund.created),
            },
        })
    }

    async fn retrieve_intent(
        &self,
        id: &PaymentId,
        pi_id: &stripe::PaymentIntentId,
    ) -> Result<stripe::PaymentIntent, ProviderError> {
        stripe::PaymentIntent::retrieve(&self.client, pi_id, &[])
            .await
            .map_err(|e| map_stripe_error(id, e))
    }

    /// Sum of refunds that succeeded or may still succeed.
    async fn refunded_total(
        &self,
        id: &PaymentId,
        pi_id: &stripe::PaymentIntentId,
    ) -> Result<MoneyAmount, ProviderError> {
        let mut params = stripe::ListRefunds::new();
        params.payment_intent = Some(pi_id.clone());
        params.limit = Some(REFUND_PAGE_LIMIT);

        let page = stripe::Refund::list(&self.client, &params)
            .await
            .map_err(|e| map_stripe_error(id, e))?;
        if page.has_more {
            tracing::warn!(payment_intent = %pi_id, "more than {REFUND_PAGE_LIMIT} refunds, total is partial");
        }

        page.data
            .iter()
            .filter(|r| convert_refund_status(r.status.as_deref()) != CancellationStatus::Failed)
            .try_fold(MoneyAmount::ZERO, |total, r| {
                total
                    .checked_add(MoneyAmount::new(r.amount)?)
                    .ok_or_else(|| ProviderError::Validation("refund total overflow".into()))
            })
    }
}

fn parse_intent_id(id: &PaymentId) -> Result<stripe::PaymentIntentId, ProviderError> {
    id.as_str()
        .parse::<stripe::PaymentIntentId>()
        .map_err(|e| ProviderError::Validation(format!("invalid PaymentIntent id {id}: {e}")))
}

/// Amount actually captured and what of it is still refundable. Both the
/// fetched `Payment` and the cancel guard are based on this.
fn captured_balance(
    amount_received: i64,
    refunded: MoneyAmount,
) -> Result<(MoneyAmount, MoneyAmount), ProviderError> {
    let received = MoneyAmount::new(amount_received)?;
    Ok((received, received.saturating_sub(refunded)))
}

fn map_stripe_error(id: &PaymentId, err: stripe::StripeError) -> ProviderError {
    match err {
        stripe::StripeError::Stripe(req) if req.http_status == 404 => {
            ProviderError::NotFound(id.to_string())
        }
        stripe::StripeError::Stripe(req) => ProviderError::Rejected(
            req.message.unwrap_or_else(|| format!("HTTP {}", req.http_status)),
        ),
        other => ProviderError::Transport(format!("Stripe API: {other}")),
    }
}

fn timestamp(unix: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(unix, 0).unwrap_or_default()
}

// ── Conversion helpers ──────────────────────────────────────────────────────

pub fn convert_currency(c: stripe::Currency) -> Result<Currency, ProviderError> {
    match c {
        stripe::Currency::KRW => Ok(Currency::Krw),
        stripe::Currency::USD => Ok(Currency::Usd),
        stripe::Currency::EUR => Ok(Currency::Eur),
        stripe::Currency::GBP => Ok(Currency::Gbp),
        stripe::Currency::JPY => Ok(Currency::Jpy),
        other => Err(ProviderError::Validation(format!(
            "unsupported currency: {other:?}"
        ))),
    }
}

/// Refunds turn a succeeded intent into a (partially) cancelled payment.
pub fn convert_pi_status(
    status: stripe::PaymentIntentStatus,
    amount: MoneyAmount,
    refunded: MoneyAmount,
) -> PaymentStatus {
    #[allow(unreachable_patterns)]
    match status {
        stripe::PaymentIntentStatus::Succeeded if refunded == MoneyAmount::ZERO => PaymentStatus::Paid,
        stripe::PaymentIntentStatus::Succeeded if refunded >= amount => PaymentStatus::Cancelled,
        stripe::PaymentIntentStatus::Succeeded => PaymentStatus::PartialCancelled,
        stripe::PaymentIntentStatus::Canceled => PaymentStatus::Failed,
        stripe::PaymentIntentStatus::Processing => PaymentStatus::Pending,
        stripe::PaymentIntentStatus::RequiresAction
        | stripe::PaymentIntentStatus::RequiresCapture
        | stripe::PaymentIntentStatus::RequiresConfirmation
        | stripe::PaymentIntentStatus::RequiresPaymentMethod => PaymentStatus::Ready,
        other => {
            tracing::warn!("unknown PaymentIntentStatus: {other:?}, defaulting to Pending");
            PaymentStatus::Pending
        }
    }
}

pub fn convert_refund_status(status: Option<&str>) -> CancellationStatus {
    match status {
        Some("succeeded") => CancellationStatus::Succeeded,
        Some("failed") | Some("canceled") => CancellationStatus::Failed,
        _ => CancellationStatus::Requested,
    }
}
