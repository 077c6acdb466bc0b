use guzo_error::ext::{NoContextResultExt, ResultExt};
use guzo_error::{Error, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::Postgres;
use std::str::FromStr;

use crate::error::{categorize, AcquireError, BeginTransactError, BuildPoolError};
use crate::Transaction;

pub use sqlx::PgConnection;

pub type PgPooledConnection = sqlx::pool::PoolConnection<Postgres>;

/// A Postgres database connection pool.
///
/// Connections are established lazily; [`PgPool::wait_until_healthy`]
/// can be used at startup to fail fast on a misconfigured database.
#[derive(Clone)]
pub struct PgPool {
    inner: sqlx::PgPool,
    readonly: bool,
}

impl PgPool {
    /// Creates a lazy pool from the global database config and one
    /// pool config (primary or replica).
    pub fn build(
        global: &guzo_config::Database,
        pool_cfg: &guzo_config::DbPoolConfig,
    ) -> Result<Self, BuildPoolError> {
        let mut pool_opts = PgPoolOptions::new()
            .acquire_timeout(global.timeout())
            .max_connections(pool_cfg.pool_size.get());

        if let Some(min_idle) = pool_cfg.min_idle {
            pool_opts = pool_opts.min_connections(min_idle.get());
        }

        let mut connect_opts = PgConnectOptions::from_str(pool_cfg.url.as_str())
            .change_context(BuildPoolError)
            .attach_printable("invalid Postgres connection URL")?;

        if global.enforce_tls {
            connect_opts = connect_opts.ssl_mode(PgSslMode::Prefer);
        }

        Ok(Self {
            inner: pool_opts.connect_lazy_with(connect_opts),
            readonly: pool_cfg.readonly,
        })
    }

    /// Wraps a pool handed out by the test harness.
    #[must_use]
    pub fn build_for_tests(pool: sqlx::PgPool) -> Self {
        Self {
            inner: pool,
            readonly: false,
        }
    }

    /// Gets the active connections of this pool.
    #[must_use]
    pub fn connections(&self) -> u32 {
        self.inner.size()
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.connections() > 0
    }

    /// It attempts to get an active database connection.
    #[tracing::instrument(name = "db.connect", skip(self))]
    pub async fn acquire(&self) -> Result<PgPooledConnection, AcquireError> {
        match self.inner.acquire().await {
            Ok(connection) => Ok(connection),
            Err(error) => {
                let category = categorize(&error);
                Err(Error::new(category, error).change_context(AcquireError))
            }
        }
    }

    /// It attempts to start a database transaction; the transaction
    /// stays active until it is committed or dropped (rollback).
    #[tracing::instrument(name = "db.transaction", skip(self))]
    pub async fn begin(&self) -> Result<Transaction<'static>, BeginTransactError> {
        if self.readonly {
            return Err(Error::unknown(BeginTransactError)
                .attach_printable("attempted to start a write transaction on a read-only pool"));
        }

        match self.inner.begin().await {
            Ok(inner) => Ok(Transaction::new(inner)),
            Err(error) => {
                let category = categorize(&error);
                Err(Error::new(category, error).change_context(BeginTransactError))
            }
        }
    }

    /// This function will try to wait for a database connection to be
    /// successfully established until there's a timeout (can be
    /// configured through `db.timeout_secs`).
    #[tracing::instrument(skip(self))]
    pub async fn wait_until_healthy(&self) -> Result<(), AcquireError> {
        match self.inner.acquire().await {
            Ok(..) => Ok(()),
            Err(error) => {
                let category = categorize(&error);
                Err(Error::new(category, error)
                    .change_context(AcquireError)
                    .attach_printable("database did not become healthy in time"))
            }
        }
    }
}

impl std::fmt::Debug for PgPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgPool")
            .field("connections", &self.connections())
            .field("readonly", &self.readonly)
            .finish()
    }
}

impl From<sqlx::PgPool> for PgPool {
    fn from(value: sqlx::PgPool) -> Self {
        Self::build_for_tests(value)
    }
}
