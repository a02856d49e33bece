/// Embedded schema migrations
///
/// SQL files under `basecampy-shared/migrations/` are compiled into the
/// binary and applied at startup, in version order, inside sqlx's
/// `_sqlx_migrations` bookkeeping table.

use sqlx::migrate::{MigrateDatabase, MigrateError, Migrator};
use sqlx::postgres::{PgPool, Postgres};
use tracing::{debug, info};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Applies every pending migration
///
/// # Errors
///
/// Returns an error if a migration fails or an applied migration was edited
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    info!(
        available = MIGRATOR.iter().count(),
        "Applying database migrations"
    );

    MIGRATOR.run(pool).await?;

    info!("Database schema is up to date");
    Ok(())
}

/// Creates the database named in the URL if it doesn't exist yet
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        debug!("Database already exists");
        return Ok(());
    }

    info!("Database does not exist, creating it");
    Postgres::create_database(database_url).await
}
