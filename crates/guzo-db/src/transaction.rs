use guzo_error::{Error, Result};
use sqlx::{PgConnection, Postgres};
use std::ops::{Deref, DerefMut};

use crate::error::{categorize, CommitError};

/// An in-progress Postgres transaction.
///
/// Dropping the value without calling [`commit`](Self::commit) rolls
/// everything back, which is exactly what a failed service call
/// wants.
pub struct Transaction<'c> {
    inner: sqlx::Transaction<'c, Postgres>,
}

impl<'c> Transaction<'c> {
    pub(crate) fn new(inner: sqlx::Transaction<'c, Postgres>) -> Self {
        Self { inner }
    }

    #[tracing::instrument(name = "db.transaction.commit", skip(self))]
    pub async fn commit(self) -> Result<(), CommitError> {
        match self.inner.commit().await {
            Ok(()) => Ok(()),
            Err(error) => {
                let category = categorize(&error);
                Err(Error::new(category, error).change_context(CommitError))
            }
        }
    }
}

impl Deref for Transaction<'_> {
    type Target = PgConnection;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for Transaction<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
