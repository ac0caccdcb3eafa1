//! Postgres connection pool.
//!
//! Wraps `deadpool-postgres` with the sizing/timeout contract the pipeline
//! expects: a bounded min/max pool, an acquire timeout that surfaces as
//! [`DbError::PoolExhausted`] rather than blocking indefinitely, and a
//! connection guard that is released back to the pool on every exit path
//! (including early return and panic unwind, via `deadpool`'s RAII object).

use std::time::Duration;

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use jobmatch_core::Config;
use tokio_postgres::NoTls;
use tracing::{info, warn};

use crate::error::DbError;

/// A checked-out connection. Dropping it returns the connection to the
/// pool; it is never leaked or left half-initialized on an error path.
pub type PooledConnection = deadpool_postgres::Object;

/// Postgres connection pool, sized and timed out per [`Config`].
#[derive(Clone)]
pub struct DbPool {
    pool: Pool,
    acquire_timeout: Duration,
}

impl DbPool {
    /// Build a pool from the resolved configuration. Does not eagerly
    /// connect; the first `acquire()` call establishes the first
    /// connection.
    pub fn new(config: &Config) -> Result<Self, DbError> {
        let pg_config: tokio_postgres::Config = config
            .database_url
            .parse()
            .map_err(|e: tokio_postgres::Error| DbError::invalid("database_url", e.to_string()))?;

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let manager = Manager::from_config(pg_config, NoTls, mgr_config);

        let pool = Pool::builder(manager)
            .max_size(config.pool_max_connections)
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| DbError::Fatal(e.to_string()))?;

        info!(
            min_connections = config.pool_min_connections,
            max_connections = config.pool_max_connections,
            acquire_timeout_ms = config.pool_acquire_timeout_ms,
            "database pool configured"
        );

        Ok(Self {
            pool,
            acquire_timeout: Duration::from_millis(config.pool_acquire_timeout_ms),
        })
    }

    /// Acquire a connection, bounded by the configured acquire timeout.
    /// Times out as [`DbError::PoolExhausted`] rather than blocking the
    /// caller indefinitely — callers hold this guard for the minimum
    /// scope needed and let it drop to release the connection.
    pub async fn acquire(&self) -> Result<PooledConnection, DbError> {
        match tokio::time::timeout(self.acquire_timeout, self.pool.get()).await {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(DbError::Fatal(e.to_string())),
            Err(_) => {
                warn!(
                    timeout_ms = self.acquire_timeout.as_millis() as u64,
                    "pool acquire timed out"
                );
                Err(DbError::PoolExhausted {
                    message: format!(
                        "no connection available within {}ms",
                        self.acquire_timeout.as_millis()
                    ),
                    pool_size: self.pool.status().max_size,
                })
            }
        }
    }

    /// Current pool status, for health reporting.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let s = self.pool.status();
        PoolStatus {
            size: s.size,
            available: s.available.max(0) as usize,
            max_size: s.max_size,
        }
    }
}

/// A snapshot of pool occupancy.
#[derive(Debug, Clone, Copy)]
pub struct PoolStatus {
    pub size: usize,
    pub available: usize,
    pub max_size: usize,
}
