use {
    super::{
        handle::{self, PaymentFuture},
        pool::{Pools, SchedulingPool},
        tracker::{ShutdownReport, TaskGroup},
    },
    crate::{
        config::BridgeConfig,
        domain::{
            cancellation::{CancelPaymentRequest, CancelPaymentResponse},
            client::PaymentClient,
            error::{BridgeError, ProviderError},
            id::PaymentId,
            payment::Payment,
        },
    },
    std::{future::Future, sync::Arc},
    tokio::runtime::Handle,
    uuid::Uuid,
};

/// Runs a [`PaymentClient`]'s async calls as tracked background tasks and
/// hands back a [`PaymentFuture`] right away.
///
/// The bridge owns every task it launches. Call [`shutdown`](Self::shutdown)
/// before dropping it to let in-flight calls finish; dropping it directly
/// cancels them.
pub struct PaymentBridge {
    client: Arc<dyn PaymentClient>,
    config: BridgeConfig,
    pools: Pools,
    tasks: TaskGroup,
}

impl PaymentBridge {
    /// Uses the runtime this is called from as the shared pool.
    pub fn new(client: Arc<dyn PaymentClient>, config: BridgeConfig) -> Result<Self, BridgeError> {
        let shared = Handle::try_current()
            .map_err(|e| BridgeError::Runtime(format!("no runtime to share: {e}")))?;
        Self::with_handle(client, config, shared)
    }

    pub fn with_handle(
        client: Arc<dyn PaymentClient>,
        config: BridgeConfig,
        shared: Handle,
    ) -> Result<Self, BridgeError> {
        config.validate()?;
        let pools = Pools::new(shared, config.dedicated_worker_threads)?;
        let tasks = TaskGroup::new(config.max_in_flight);
        tracing::debug!(
            default_pool = %config.default_pool,
            max_in_flight = config.max_in_flight,
            "payment bridge started"
        );
        Ok(Self {
            client,
            config,
            pools,
            tasks,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn fetch_payment(&self, id: &PaymentId) -> PaymentFuture<Payment> {
        self.fetch_payment_on(id, self.config.default_pool)
    }

    pub fn fetch_payment_on(&self, id: &PaymentId, pool: SchedulingPool) -> PaymentFuture<Payment> {
        let client = Arc::clone(&self.client);
        let id = id.clone();
        self.submit("fetch_payment", pool, async move { client.get_payment(&id).await })
    }

    pub fn cancel_payment(&self, request: CancelPaymentRequest) -> PaymentFuture<CancelPaymentResponse> {
        self.cancel_payment_on(request, self.config.default_pool)
    }

    pub fn cancel_payment_on(
        &self,
        request: CancelPaymentRequest,
        pool: SchedulingPool,
    ) -> PaymentFuture<CancelPaymentResponse> {
        let client = Arc::clone(&self.client);
        self.submit("cancel_payment", pool, async move {
            client.cancel_payment(&request).await
        })
    }

    /// Calls launched and not yet resolved, queued ones included.
    pub fn in_flight(&self) -> usize {
        self.tasks.in_flight()
    }

    pub fn is_shut_down(&self) -> bool {
        self.tasks.is_closed()
    }

    /// Stops accepting calls, lets running ones finish within
    /// `shutdown_grace`, cancels the remainder, and stops the dedicated
    /// runtime. Later submissions resolve to `ShutDown`.
    pub async fn shutdown(&self) -> ShutdownReport {
        tracing::info!(in_flight = self.in_flight(), "payment bridge shutting down");
        let report = self.tasks.shutdown(self.config.shutdown_grace).await;
        self.pools.close_dedicated();
        tracing::info!(
            drained = report.drained,
            cancelled = report.cancelled,
            "payment bridge shut down"
        );
        report
    }

    fn submit<T, F>(&self, operation: &'static str, pool: SchedulingPool, call: F) -> PaymentFuture<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, ProviderError>> + Send + 'static,
    {
        let request_id = Uuid::now_v7();
        let (completer, future) = handle::channel(request_id, self.tasks.cancel_signal());

        let Some(mut permit) = self.tasks.enter() else {
            tracing::debug!(%request_id, operation, "payment bridge is shut down, call refused");
            completer.complete(Err(BridgeError::ShutDown));
            return future;
        };

        tracing::debug!(%request_id, operation, %pool, "payment call submitted");
        let task = async move {
            let result = permit.run(call).await;
            tracing::debug!(%request_id, operation, ok = result.is_ok(), "payment call resolved");
            completer.complete(result);
            drop(permit);
        };

        // Holding a permit keeps shutdown from closing the dedicated runtime,
        // so this only fails if the bridge is torn down mid-call. The dropped
        // task still resolves its handle.
        if let Err(e) = self.pools.spawn(pool, task) {
            tracing::warn!(%request_id, operation, error = %e, "failed to spawn payment call");
        }
        future
    }
}

impl Drop for PaymentBridge {
    // Tasks torn down with the dedicated runtime never reach `complete`; the
    // cancel flag must be set first so their handles read `Cancelled`.
    fn drop(&mut self) {
        if self.in_flight() > 0 {
            tracing::warn!(
                in_flight = self.in_flight(),
                "payment bridge dropped without shutdown, cancelling in-flight calls"
            );
        }
        self.tasks.cancel_all();
        self.pools.close_dedicated();
    }
}
