#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use payment_bridge::domain::cancellation::{
    CancelPaymentRequest, CancelPaymentResponse, Cancellation, CancellationStatus,
};
use payment_bridge::domain::client::{ClientFuture, PaymentClient};
use payment_bridge::domain::error::ProviderError;
use payment_bridge::domain::id::{CancellationId, PaymentId};
use payment_bridge::domain::money::{Currency, Money, MoneyAmount};
use payment_bridge::domain::payment::{Payment, PaymentStatus};
use payment_bridge::{BridgeConfig, PaymentBridge};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn payment_id(id: &str) -> PaymentId {
    PaymentId::new(id).unwrap()
}

pub fn amount(minor_units: i64) -> MoneyAmount {
    MoneyAmount::new(minor_units).unwrap()
}

/// A paid payment with a fixed creation time, so equal inputs compare equal.
pub fn make_payment(id: &str, total: i64) -> Payment {
    Payment::new(
        payment_id(id),
        PaymentStatus::Paid,
        Money::new(amount(total), Currency::Krw),
        MoneyAmount::ZERO,
        serde_json::json!({"order": id}),
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
    )
}

/// Echoes the request back as a succeeded cancellation.
pub fn echo_cancellation(request: &CancelPaymentRequest) -> CancelPaymentResponse {
    CancelPaymentResponse {
        cancellation: Cancellation {
            id: CancellationId::new(format!("cancel_{}", request.payment_id())).unwrap(),
            status: CancellationStatus::Succeeded,
            amount: request.amount().unwrap_or(amount(5000)),
            reason: request.reason().to_string(),
            requested_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        },
    }
}

type FetchFn = dyn Fn(&PaymentId) -> Result<Payment, ProviderError> + Send + Sync;
type CancelFn = dyn Fn(&CancelPaymentRequest) -> Result<CancelPaymentResponse, ProviderError> + Send + Sync;
type DelayFn = dyn Fn(&PaymentId) -> Duration + Send + Sync;

/// Scriptable client that records every call it receives.
pub struct MockPaymentClient {
    fetch: Box<FetchFn>,
    cancel: Box<CancelFn>,
    delay: Box<DelayFn>,
    pub fetch_calls: Mutex<Vec<PaymentId>>,
    pub cancel_calls: Mutex<Vec<CancelPaymentRequest>>,
    pub thread_names: Mutex<Vec<Option<String>>>,
    running: AtomicUsize,
    peak: AtomicUsize,
    completed: AtomicUsize,
}

impl MockPaymentClient {
    /// Returns a 5000-unit payment for whatever id is asked, and echoes
    /// cancellations.
    pub fn echo() -> Self {
        Self {
            fetch: Box::new(|id| Ok(make_payment(id.as_str(), 5000))),
            cancel: Box::new(|req| Ok(echo_cancellation(req))),
            delay: Box::new(|_| Duration::ZERO),
            fetch_calls: Mutex::new(Vec::new()),
            cancel_calls: Mutex::new(Vec::new()),
            thread_names: Mutex::new(Vec::new()),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        self.with_delay_fn(move |_| delay)
    }

    pub fn with_delay_fn(mut self, f: impl Fn(&PaymentId) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Box::new(f);
        self
    }

    pub fn with_fetch(
        mut self,
        f: impl Fn(&PaymentId) -> Result<Payment, ProviderError> + Send + Sync + 'static,
    ) -> Self {
        self.fetch = Box::new(f);
        self
    }

    pub fn with_cancel(
        mut self,
        f: impl Fn(&CancelPaymentRequest) -> Result<CancelPaymentResponse, ProviderError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.cancel = Box::new(f);
        self
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.lock().unwrap().len()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancel_calls.lock().unwrap().len()
    }

    async fn simulate_latency(&self, id: &PaymentId) {
        self.thread_names
            .lock()
            .unwrap()
            .push(std::thread::current().name().map(str::to_owned));
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = (self.delay)(id);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.running.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

impl PaymentClient for MockPaymentClient {
    fn get_payment(&self, id: &PaymentId) -> ClientFuture<'_, Payment> {
        let id = id.clone();
        Box::pin(async move {
            self.fetch_calls.lock().unwrap().push(id.clone());
            self.simulate_latency(&id).await;
            (self.fetch)(&id)
        })
    }

    fn cancel_payment(&self, request: &CancelPaymentRequest) -> ClientFuture<'_, CancelPaymentResponse> {
        let request = request.clone();
        Box::pin(async move {
            self.cancel_calls.lock().unwrap().push(request.clone());
            self.simulate_latency(request.payment_id()).await;
            (self.cancel)(&request)
        })
    }
}

pub fn test_config() -> BridgeConfig {
    BridgeConfig {
        max_in_flight: 16,
        dedicated_worker_threads: 1,
        shutdown_grace: Duration::from_secs(2),
        ..BridgeConfig::default()
    }
}

/// Bridge on the current runtime, plus the mock so tests can inspect calls.
pub fn bridge_with(client: MockPaymentClient, config: BridgeConfig) -> (PaymentBridge, Arc<MockPaymentClient>) {
    init_tracing();
    let client = Arc::new(client);
    let bridge = PaymentBridge::new(client.clone(), config).unwrap();
    (bridge, client)
}
