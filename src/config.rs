use {
    crate::{domain::error::BridgeError, services::pool::SchedulingPool},
    serde::{Deserialize, Serialize},
    std::{str::FromStr, time::Duration},
};

const DEFAULT_POOL_VAR: &str = "PAYMENT_BRIDGE_DEFAULT_POOL";
const MAX_IN_FLIGHT_VAR: &str = "PAYMENT_BRIDGE_MAX_IN_FLIGHT";
const IO_THREADS_VAR: &str = "PAYMENT_BRIDGE_IO_THREADS";
const SHUTDOWN_GRACE_VAR: &str = "PAYMENT_BRIDGE_SHUTDOWN_GRACE_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Pool used by `fetch_payment` / `cancel_payment` when no pool is named.
    pub default_pool: SchedulingPool,
    /// Upper bound on client calls running at once; extra calls queue.
    pub max_in_flight: usize,
    /// Worker threads of the dedicated I/O runtime.
    pub dedicated_worker_threads: usize,
    /// How long `shutdown` waits for in-flight calls before cancelling them.
    #[serde(with = "duration_ms")]
    pub shutdown_grace: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            default_pool: SchedulingPool::Shared,
            max_in_flight: 64,
            dedicated_worker_threads: 2,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl BridgeConfig {
    /// Reads `PAYMENT_BRIDGE_*` variables, loading `.env` first if present.
    pub fn from_env() -> Result<Self, BridgeError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`. Unset variables
    /// keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BridgeError> {
        let mut config = Self::default();

        if let Some(pool) = parse_var::<SchedulingPool>(&lookup, DEFAULT_POOL_VAR)? {
            config.default_pool = pool;
        }
        if let Some(n) = parse_var::<usize>(&lookup, MAX_IN_FLIGHT_VAR)? {
            config.max_in_flight = n;
        }
        if let Some(n) = parse_var::<usize>(&lookup, IO_THREADS_VAR)? {
            config.dedicated_worker_threads = n;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, SHUTDOWN_GRACE_VAR)? {
            config.shutdown_grace = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.max_in_flight == 0 {
            return Err(BridgeError::Config("max_in_flight must be at least 1".into()));
        }
        if self.dedicated_worker_threads == 0 {
            return Err(BridgeError::Config(
                "dedicated_worker_threads must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, BridgeError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| BridgeError::Config(format!("{key}={raw:?}: {e}"))),
    }
}

mod duration_ms {
    use {
        serde::{Deserialize, Deserializer, Serializer},
        std::time::Duration,
    };

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(super::millis(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
