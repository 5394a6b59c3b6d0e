use {
    crate::{
        config::millis,
        domain::error::{BridgeError, ProviderError},
    },
    std::{
        future::Future,
        sync::{
            Arc, Mutex, PoisonError,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    },
    tokio::sync::{Semaphore, mpsc, watch},
};

/// Result of [`PaymentBridge::shutdown`](super::bridge::PaymentBridge::shutdown).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Every in-flight call finished within the grace period.
    pub drained: bool,
    /// Calls resolved to `Cancelled` because the grace period ran out.
    pub cancelled: usize,
}

/// Owned scope for every call the bridge launches: limits concurrency, counts
/// what is running, and can drain or cancel all of it.
pub(crate) struct TaskGroup {
    limiter: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    cancelled: Arc<AtomicUsize>,
    // Each task holds a clone; the receiver sees `None` once all are gone.
    drain_tx: Mutex<Option<mpsc::Sender<()>>>,
    drain_rx: tokio::sync::Mutex<mpsc::Receiver<()>>,
    cancel_tx: watch::Sender<bool>,
}

impl TaskGroup {
    pub(crate) fn new(max_in_flight: usize) -> Self {
        let (drain_tx, drain_rx) = mpsc::channel(1);
        let (cancel_tx, _) = watch::channel(false);
        Self {
            limiter: Arc::new(Semaphore::new(max_in_flight)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            cancelled: Arc::new(AtomicUsize::new(0)),
            drain_tx: Mutex::new(Some(drain_tx)),
            drain_rx: tokio::sync::Mutex::new(drain_rx),
            cancel_tx,
        }
    }

    /// Registers a new task. `None` once shutdown has begun.
    pub(crate) fn enter(&self) -> Option<TaskPermit> {
        let drain = self
            .drain_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()?
            .clone();
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Some(TaskPermit {
            limiter: Arc::clone(&self.limiter),
            in_flight: Arc::clone(&self.in_flight),
            cancelled: Arc::clone(&self.cancelled),
            cancel_rx: self.cancel_tx.subscribe(),
            _drain: drain,
        })
    }

    /// Observes the group's cancel flag.
    pub(crate) fn cancel_signal(&self) -> watch::Receiver<bool> {
        self.cancel_tx.subscribe()
    }

    /// Asks every running and queued task to resolve as `Cancelled`.
    pub(crate) fn cancel_all(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.drain_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Stops admitting tasks, waits up to `grace` for the running ones, then
    /// cancels the rest and waits for them to unwind.
    pub(crate) async fn shutdown(&self, grace: Duration) -> ShutdownReport {
        drop(
            self.drain_tx
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );

        let mut drain = self.drain_rx.lock().await;
        let drained = tokio::time::timeout(grace, drain.recv()).await.is_ok();

        if !drained {
            tracing::warn!(
                in_flight = self.in_flight(),
                grace_ms = millis(grace),
                "shutdown grace elapsed, cancelling in-flight payment calls"
            );
            self.cancel_all();
            drain.recv().await;
        }

        ShutdownReport {
            drained,
            cancelled: self.cancelled.load(Ordering::SeqCst),
        }
    }
}

/// Membership of one task in a [`TaskGroup`]. Dropping it marks the task done.
pub(crate) struct TaskPermit {
    limiter: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    cancelled: Arc<AtomicUsize>,
    cancel_rx: watch::Receiver<bool>,
    _drain: mpsc::Sender<()>,
}

impl TaskPermit {
    /// Runs `call` once a concurrency slot is free, unless the group is
    /// cancelled first.
    pub(crate) async fn run<T, F>(&mut self, call: F) -> Result<T, BridgeError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        let limiter = Arc::clone(&self.limiter);
        let limited = async move {
            match limiter.acquire_owned().await {
                Ok(_slot) => call.await.map_err(BridgeError::from),
                Err(_) => Err(BridgeError::ShutDown),
            }
        };

        tokio::select! {
            biased;
            _ = cancel_requested(&mut self.cancel_rx) => {
                self.cancelled.fetch_add(1, Ordering::SeqCst);
                Err(BridgeError::Cancelled)
            }
            result = limited => result,
        }
    }
}

impl Drop for TaskPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

// Also fires when the group itself is dropped.
async fn cancel_requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
