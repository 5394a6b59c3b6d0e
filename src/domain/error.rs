use {super::money::MoneyAmount, thiserror::Error};

/// Failures produced by a payment client. The bridge hands these to callers
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("payment not found: {0}")]
    NotFound(String),

    #[error("cancellable amount mismatch: expected {expected}, actual {actual}")]
    CancellableAmountMismatch {
        expected: MoneyAmount,
        actual: MoneyAmount,
    },

    #[error("payment not cancellable: {0}")]
    NotCancellable(String),

    #[error("rejected by provider: {0}")]
    Rejected(String),

    #[error("transport: {0}")]
    Transport(String),
}

/// What a `PaymentFuture` resolves to when it does not resolve to a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("payment bridge is shut down")]
    ShutDown,

    #[error("call cancelled by bridge shutdown")]
    Cancelled,

    #[error("call ended without producing a result")]
    Abandoned,

    #[error("config: {0}")]
    Config(String),

    #[error("runtime: {0}")]
    Runtime(String),
}
