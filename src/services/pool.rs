use {
    crate::domain::error::BridgeError,
    derive_more::Display,
    serde::{Deserialize, Serialize},
    std::{
        future::Future,
        str::FromStr,
        sync::{Mutex, PoisonError},
    },
    tokio::runtime::{Builder, Handle, Runtime},
};

const IO_THREAD_NAME: &str = "payment-bridge-io";

/// Where a bridged call runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulingPool {
    /// The runtime the owning service handed to the bridge.
    #[display("shared")]
    Shared,
    /// The bridge's own I/O runtime, isolated from the service's workers.
    #[display("dedicated")]
    Dedicated,
}

impl FromStr for SchedulingPool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shared" => Ok(Self::Shared),
            "dedicated" => Ok(Self::Dedicated),
            other => Err(format!("unknown scheduling pool: {other} (expected shared or dedicated)")),
        }
    }
}

/// The two places a call can be spawned. The dedicated runtime is owned here
/// and dies with it.
pub(crate) struct Pools {
    shared: Handle,
    dedicated: Mutex<Option<Runtime>>,
}

impl Pools {
    pub(crate) fn new(shared: Handle, dedicated_worker_threads: usize) -> Result<Self, BridgeError> {
        let dedicated = Builder::new_multi_thread()
            .worker_threads(dedicated_worker_threads)
            .thread_name(IO_THREAD_NAME)
            .enable_all()
            .build()
            .map_err(|e| BridgeError::Runtime(format!("failed to build dedicated runtime: {e}")))?;

        Ok(Self {
            shared,
            dedicated: Mutex::new(Some(dedicated)),
        })
    }

    pub(crate) fn spawn<F>(&self, pool: SchedulingPool, task: F) -> Result<(), BridgeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match pool {
            SchedulingPool::Shared => {
                self.shared.spawn(task);
                Ok(())
            }
            SchedulingPool::Dedicated => {
                let guard = self.dedicated.lock().unwrap_or_else(PoisonError::into_inner);
                match guard.as_ref() {
                    Some(runtime) => {
                        runtime.spawn(task);
                        Ok(())
                    }
                    None => Err(BridgeError::ShutDown),
                }
            }
        }
    }

    /// Tears the dedicated runtime down without blocking, so it is safe from
    /// inside async code. Idempotent.
    pub(crate) fn close_dedicated(&self) {
        let runtime = self
            .dedicated
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(runtime) = runtime {
            runtime.shutdown_background();
        }
    }
}

impl Drop for Pools {
    fn drop(&mut self) {
        self.close_dedicated();
    }
}
