use guzo_error::ext::NoContextResultExt;
use guzo_error::Result;
use sqlx::migrate::Migrator;
use sqlx::PgConnection;
use tokio::time::Instant;
use tracing::info;

use crate::error::MigrationError;

#[tracing::instrument(skip_all, name = "migrations.run_pending")]
pub async fn run_pending(
    conn: &mut PgConnection,
    migrator: &Migrator,
) -> Result<(), MigrationError> {
    let now = Instant::now();
    info!("Performing database migrations... (this may take a while)");

    migrator.run(conn).await.change_context(MigrationError)?;

    let elapsed = now.elapsed();
    info!("Successfully performed database migrations! took {elapsed:.2?}");

    Ok(())
}
