use guzo_error::ApiErrorCategory;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Could not build database pool")]
pub struct BuildPoolError;

#[derive(Debug, Error)]
#[error("Could not acquire database connection")]
pub struct AcquireError;

#[derive(Debug, Error)]
#[error("Could not begin database transaction")]
pub struct BeginTransactError;

#[derive(Debug, Error)]
#[error("Could not commit database transaction")]
pub struct CommitError;

#[derive(Debug, Error)]
#[error("Could not run database migrations")]
pub struct MigrationError;

/// Failures of the database service itself surface as an outage to
/// API consumers; everything else stays an internal error.
pub(crate) fn categorize(error: &sqlx::Error) -> ApiErrorCategory {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(..) => {
            ApiErrorCategory::Outage
        }
        _ => ApiErrorCategory::Unknown,
    }
}
