use axum::extract::{FromRequestParts, State};
use guzo_db::error::{AcquireError, BeginTransactError};
use guzo_db::{PgPool, PgPooledConnection, Transaction};
use guzo_error::ext::ResultExt;
use guzo_error::Result;
use jsonwebtoken::{DecodingKey, EncodingKey};
use std::sync::Arc;
use thiserror::Error;
use tracing::{trace, warn};

mod validators;

#[derive(Clone, FromRequestParts)]
#[from_request(via(State))]
#[must_use]
pub struct App(Arc<AppInner>);

pub struct AppInner {
    pub config: Arc<guzo_config::Server>,

    pub primary_db: PgPool,
    pub replica_db: Option<PgPool>,

    pub jwt_encode: EncodingKey,
    pub jwt_decode: DecodingKey,
}

#[derive(Debug, Error)]
#[error("Could not initialize server application")]
pub struct AppError;

impl App {
    pub fn new(config: guzo_config::Server) -> Result<Self, AppError> {
        let primary_db = PgPool::build(&config.database, &config.database.primary)
            .change_context(AppError)
            .attach_printable("could not build primary database pool")?;

        let replica_db = config
            .database
            .replica
            .as_ref()
            .map(|replica| PgPool::build(&config.database, replica))
            .transpose()
            .change_context(AppError)
            .attach_printable("could not build replica database pool")?;

        let secret = config.auth.jwt_secret.as_str().as_bytes();
        let jwt_encode = EncodingKey::from_secret(secret);
        let jwt_decode = DecodingKey::from_secret(secret);

        let inner = Arc::new(AppInner {
            config: Arc::new(config),

            primary_db,
            replica_db,

            jwt_encode,
            jwt_decode,
        });

        Ok(Self(inner))
    }

    /// Creates a new [`App`] for testing purposes. The pool comes
    /// from the test harness and doubles as the primary database.
    #[must_use]
    pub fn new_for_tests(pool: PgPool) -> Self {
        let config = guzo_config::Server::for_tests();

        let secret = config.auth.jwt_secret.as_str().as_bytes();
        let jwt_encode = EncodingKey::from_secret(secret);
        let jwt_decode = DecodingKey::from_secret(secret);

        Self(Arc::new(AppInner {
            config: Arc::new(config),

            primary_db: pool,
            replica_db: None,

            jwt_encode,
            jwt_decode,
        }))
    }
}

impl App {
    /// Obtains a read/write transaction from the primary database
    /// pool.
    #[tracing::instrument(skip_all, name = "app.db_write")]
    pub async fn db_write(&self) -> Result<Transaction<'static>, BeginTransactError> {
        trace!("obtaining primary db transaction...");
        self.primary_db.begin().await
    }

    /// Obtains a readonly database connection from the replica pool
    /// or the primary pool, whichever is possible to obtain.
    ///
    /// The replica pool will be the first to obtain, if not, then the
    /// primary pool will be obtained instead.
    #[tracing::instrument(skip_all, name = "app.db_read")]
    pub async fn db_read(&self) -> Result<PgPooledConnection, AcquireError> {
        trace!("obtaining replica db connection...");

        let Some(replica_pool) = self.replica_db.as_ref() else {
            return self.primary_db.acquire().await;
        };

        match replica_pool.acquire().await {
            Ok(connection) => Ok(connection),
            Err(error) => {
                warn!(%error, "Replica database is not available, falling back to primary");
                self.primary_db.acquire().await
            }
        }
    }

    /// Obtains a readonly database connection from the primary pool.
    ///
    /// If the primary pool is not available, the replica pool will be
    /// used instead to obtain the connection.
    #[tracing::instrument(skip_all, name = "app.db_read_prefer_primary")]
    pub async fn db_read_prefer_primary(&self) -> Result<PgPooledConnection, AcquireError> {
        trace!("obtaining primary db connection...");

        let Some(replica_pool) = self.replica_db.as_ref() else {
            return self.primary_db.acquire().await;
        };

        match self.primary_db.acquire().await {
            Ok(connection) => Ok(connection),
            Err(error) => {
                warn!(%error, "Primary database is not available, falling back to replica");
                replica_pool.acquire().await
            }
        }
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("primary_db", &self.primary_db)
            .field("replica_db", &self.replica_db)
            .finish_non_exhaustive()
    }
}

impl std::ops::Deref for App {
    type Target = AppInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
