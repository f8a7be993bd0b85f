//! Page store connection pool.
//!
//! The recommendation binary makes two short reads per request, so the pool
//! stays small and idle connections are released quickly.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

use notekey_core::{Error, Result};

/// Default maximum number of pooled connections.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default time to wait for a free connection, in seconds.
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Default time an unused connection is kept open, in seconds.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

/// Connection settings for the page store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }
}

impl PoolConfig {
    /// Create from environment variables, falling back to defaults.
    ///
    /// A zero connection limit is rejected; sqlx would never hand out a
    /// connection.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base = Self::default();

        let max_connections = match lookup("NOTEKEY_DB_MAX_CONNECTIONS") {
            Some(v) => match v.trim().parse::<u32>() {
                Ok(0) | Err(_) => {
                    return Err(Error::Config(format!(
                        "NOTEKEY_DB_MAX_CONNECTIONS must be a positive integer, got '{}'",
                        v
                    )))
                }
                Ok(n) => n,
            },
            None => base.max_connections,
        };

        Ok(Self {
            max_connections,
            acquire_timeout: secs(&lookup, "NOTEKEY_DB_ACQUIRE_TIMEOUT_SECS")?
                .unwrap_or(base.acquire_timeout),
            idle_timeout: secs(&lookup, "NOTEKEY_DB_IDLE_TIMEOUT_SECS")?
                .unwrap_or(base.idle_timeout),
        })
    }
}

fn secs(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Duration>> {
    lookup(key)
        .map(|v| {
            v.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| Error::Config(format!("{} must be whole seconds, got '{}'", key, v)))
        })
        .transpose()
}

/// Open a pool with default settings.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    create_pool_with_config(database_url, PoolConfig::default()).await
}

/// Open a pool with explicit settings. Fails if the first connection cannot
/// be established within `acquire_timeout`.
pub async fn create_pool_with_config(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    let start = Instant::now();

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "database",
        component = "pool",
        op = "connect",
        max_connections = config.max_connections,
        acquire_timeout_secs = config.acquire_timeout.as_secs(),
        pool_size = pool.size(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Page store pool connected"
    );
    Ok(pool)
}

/// Log pool occupancy, warning when every connection is checked out.
pub fn log_pool_metrics(pool: &PgPool) {
    let size = pool.size();
    let idle = pool.num_idle();

    debug!(
        subsystem = "database",
        component = "pool",
        op = "metrics",
        pool_size = size,
        pool_idle = idle,
        "Pool occupancy"
    );

    if idle == 0 && size > 0 {
        warn!(
            subsystem = "database",
            component = "pool",
            pool_size = size,
            "No idle page store connections"
        );
    }
}
