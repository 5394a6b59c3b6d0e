use {
    crate::domain::error::BridgeError,
    std::{
        future::Future,
        pin::Pin,
        task::{Context, Poll},
    },
    tokio::sync::{
        oneshot::{self, error::TryRecvError},
        watch,
    },
    uuid::Uuid,
};

type Outcome<T> = Result<T, BridgeError>;

/// Pending result of a bridged call.
///
/// Async callers `.await` it. Callers that cannot suspend either poll it with
/// [`try_result`](Self::try_result) or block a thread on [`wait`](Self::wait).
/// Dropping it does not stop the call; the result is discarded.
#[derive(Debug)]
pub struct PaymentFuture<T> {
    request_id: Uuid,
    rx: oneshot::Receiver<Outcome<T>>,
}

/// Sending half of a [`PaymentFuture`]. If it is dropped without completing,
/// the task was torn down; the handle then reports `Cancelled` when the bridge
/// had asked for cancellation and `Abandoned` otherwise.
pub(crate) struct Completer<T> {
    tx: Option<oneshot::Sender<Outcome<T>>>,
    cancel: watch::Receiver<bool>,
}

impl<T> Completer<T> {
    pub(crate) fn complete(mut self, outcome: Outcome<T>) {
        if let Some(tx) = self.tx.take() {
            // Nobody listening is fine: the caller dropped the handle.
            let _ = tx.send(outcome);
        }
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let err = if *self.cancel.borrow() {
                BridgeError::Cancelled
            } else {
                BridgeError::Abandoned
            };
            let _ = tx.send(Err(err));
        }
    }
}

pub(crate) fn channel<T>(
    request_id: Uuid,
    cancel: watch::Receiver<bool>,
) -> (Completer<T>, PaymentFuture<T>) {
    let (tx, rx) = oneshot::channel();
    (
        Completer {
            tx: Some(tx),
            cancel,
        },
        PaymentFuture { request_id, rx },
    )
}

impl<T> PaymentFuture<T> {
    /// Correlates this handle with the bridge's log lines.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// `None` while the call is pending. A result can be taken once; later
    /// calls report `Abandoned`.
    pub fn try_result(&mut self) -> Option<Outcome<T>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(BridgeError::Abandoned)),
        }
    }

    /// Blocks the current thread until the call resolves.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context.
    pub fn wait(self) -> Outcome<T> {
        self.rx
            .blocking_recv()
            .unwrap_or(Err(BridgeError::Abandoned))
    }
}

impl<T> Future for PaymentFuture<T> {
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(BridgeError::Abandoned)))
    }
}
