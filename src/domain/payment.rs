use {
    super::error::ProviderError,
    super::id::PaymentId,
    super::money::{Money, MoneyAmount},
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::fmt,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Ready,
    Pending,
    Paid,
    PartialCancelled,
    Cancelled,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::PartialCancelled => "partial_cancelled",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = ProviderError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "ready" => Ok(Self::Ready),
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "partial_cancelled" => Ok(Self::PartialCancelled),
            "cancelled" => Ok(Self::Cancelled),
            "failed" => Ok(Self::Failed),
            other => Err(ProviderError::Validation(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

/// A charge as the provider reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    id: PaymentId,
    status: PaymentStatus,
    money: Money,
    cancelled: MoneyAmount,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        id: PaymentId,
        status: PaymentStatus,
        money: Money,
        cancelled: MoneyAmount,
        metadata: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            status,
            money,
            cancelled,
            metadata,
            created_at,
        }
    }

    pub fn id(&self) -> &PaymentId {
        &self.id
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn money(&self) -> &Money {
        &self.money
    }

    pub fn cancelled(&self) -> MoneyAmount {
        self.cancelled
    }

    /// What a cancellation could still take back right now.
    pub fn cancellable_amount(&self) -> MoneyAmount {
        self.money.amount().saturating_sub(self.cancelled)
    }

    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Currency;

    #[test]
    fn cancellable_amount_subtracts_cancelled() {
        let payment = Payment::new(
            PaymentId::new("pay_1").unwrap(),
            PaymentStatus::PartialCancelled,
            Money::new(MoneyAmount::new(5000).unwrap(), Currency::Krw),
            MoneyAmount::new(1200).unwrap(),
            serde_json::json!({}),
            Utc::now(),
        );
        assert_eq!(payment.cancellable_amount().minor_units(), 3800);
    }

    #[test]
    fn status_roundtrips_through_str() {
        for status in [
            PaymentStatus::Ready,
            PaymentStatus::Pending,
            PaymentStatus::Paid,
            PaymentStatus::PartialCancelled,
            PaymentStatus::Cancelled,
            PaymentStatus::Failed,
        ] {
            assert_eq!(PaymentStatus::try_from(status.as_str()).unwrap(), status);
        }
    }
}
