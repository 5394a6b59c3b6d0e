use {
    super::cancellation::{CancelPaymentRequest, CancelPaymentResponse},
    super::error::ProviderError,
    super::id::PaymentId,
    super::payment::Payment,
    std::{future::Future, pin::Pin},
};

pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// The provider capability the bridge adapts. Transport, auth and retries live
/// behind this trait.
pub trait PaymentClient: Send + Sync {
    fn get_payment(&self, id: &PaymentId) -> ClientFuture<'_, Payment>;

    fn cancel_payment(&self, request: &CancelPaymentRequest) -> ClientFuture<'_, CancelPaymentResponse>;
}
