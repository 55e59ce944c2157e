use crate::connection::DatabasePool;
use crate::error::{DatabaseError, DatabaseResult};
use sqlx::migrate::Migrator;
use tracing::info;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply every pending schema migration.
pub async fn run_migrations(pool: &DatabasePool) -> DatabaseResult<()> {
    info!(
        available = MIGRATOR.iter().count(),
        "Running database migrations"
    );
    MIGRATOR
        .run(pool.pool())
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;
    info!("Database migrations complete");
    Ok(())
}
