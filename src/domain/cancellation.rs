use {
    super::error::ProviderError,
    super::id::{CancellationId, PaymentId},
    super::money::MoneyAmount,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Arguments of a cancel call, forwarded to the client as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CancelPaymentRequestFields")]
pub struct CancelPaymentRequest {
    payment_id: PaymentId,
    amount: Option<MoneyAmount>,
    reason: String,
    current_cancellable_amount: Option<MoneyAmount>,
}

impl CancelPaymentRequest {
    /// Full cancellation with no guard. Use the builder methods to narrow it.
    pub fn new(payment_id: PaymentId, reason: impl Into<String>) -> Result<Self, ProviderError> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(ProviderError::Validation(
                "cancellation reason must not be empty".to_string(),
            ));
        }
        Ok(Self {
            payment_id,
            amount: None,
            reason,
            current_cancellable_amount: None,
        })
    }

    /// Partial cancellation of `amount`. `None` cancels everything cancellable.
    pub fn with_amount(mut self, amount: Option<MoneyAmount>) -> Self {
        self.amount = amount;
        self
    }

    /// The balance the caller believes is cancellable; the provider refuses the
    /// cancellation if it has moved.
    pub fn with_current_cancellable_amount(mut self, guard: Option<MoneyAmount>) -> Self {
        self.current_cancellable_amount = guard;
        self
    }

    pub fn payment_id(&self) -> &PaymentId {
        &self.payment_id
    }

    pub fn amount(&self) -> Option<MoneyAmount> {
        self.amount
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn current_cancellable_amount(&self) -> Option<MoneyAmount> {
        self.current_cancellable_amount
    }
}

// Wire shape of a request; goes through `CancelPaymentRequest::new` on the way in.
#[derive(Deserialize)]
struct CancelPaymentRequestFields {
    payment_id: PaymentId,
    #[serde(default)]
    amount: Option<MoneyAmount>,
    reason: String,
    #[serde(default)]
    current_cancellable_amount: Option<MoneyAmount>,
}

impl TryFrom<CancelPaymentRequestFields> for CancelPaymentRequest {
    type Error = ProviderError;

    fn try_from(fields: CancelPaymentRequestFields) -> Result<Self, Self::Error> {
        Ok(Self::new(fields.payment_id, fields.reason)?
            .with_amount(fields.amount)
            .with_current_cancellable_amount(fields.current_cancellable_amount))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancellationStatus {
    Requested,
    Succeeded,
    Failed,
}

impl CancellationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CancellationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub id: CancellationId,
    pub status: CancellationStatus,
    pub amount: MoneyAmount,
    pub reason: String,
    pub requested_at: DateTime<Utc>,
}

/// Outcome of a cancel call as the provider reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPaymentResponse {
    pub cancellation: Cancellation,
}
