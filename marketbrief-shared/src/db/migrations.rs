/// Schema migration runner
///
/// Wraps sqlx's embedded migrator. Migrations live in this crate's
/// `migrations/` directory as reversible `.up.sql` / `.down.sql` pairs and
/// are compiled into the binary, so the API server, the worker, and the
/// import tool can each bring a fresh database up to date at startup
/// without shipping SQL files alongside the executable.

use sqlx::{migrate::MigrateDatabase, postgres::PgPool, Postgres};
use tracing::{debug, info};

/// Snapshot of what the `_sqlx_migrations` bookkeeping table records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Count of successfully applied migrations
    pub applied_migrations: usize,

    /// Version (timestamp) of the most recently applied migration, None on
    /// a database that has never been migrated
    pub latest_version: Option<i64>,
}

/// Applies every pending migration
///
/// Already-applied migrations are skipped, so calling this from several
/// binaries against the same database is safe; sqlx serializes concurrent
/// runners through an advisory lock.
///
/// # Errors
///
/// Returns an error if a migration statement fails or if a previously
/// applied migration's checksum no longer matches its file.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    let migrator = sqlx::migrate!("./migrations");
    info!(
        embedded = migrator.iter().count(),
        "Applying database migrations"
    );

    migrator.run(pool).await?;

    info!("Database schema is up to date");
    Ok(())
}

/// Reads migration bookkeeping without touching the schema
///
/// # Errors
///
/// Returns an error if the bookkeeping table exists but cannot be queried
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    // to_regclass is NULL until the migrator has run at least once; probing
    // it first avoids erroring on a fresh database
    let table_exists: bool =
        sqlx::query_scalar("SELECT to_regclass('public._sqlx_migrations') IS NOT NULL")
            .fetch_one(pool)
            .await?;

    if !table_exists {
        debug!("No migrations table, database is unmigrated");
        return Ok(MigrationStatus {
            applied_migrations: 0,
            latest_version: None,
        });
    }

    let (count, latest_version): (i64, Option<i64>) =
        sqlx::query_as("SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success")
            .fetch_one(pool)
            .await?;

    debug!(
        applied = count,
        latest = ?latest_version,
        "Read migration status"
    );

    Ok(MigrationStatus {
        applied_migrations: count as usize,
        latest_version,
    })
}

/// Creates the database named in the URL if it is missing
///
/// Convenience for development and test environments. Production databases
/// are provisioned out of band.
///
/// # Errors
///
/// Returns an error if the server is unreachable or the connecting role
/// lacks CREATEDB.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        debug!("Database already exists");
        return Ok(());
    }

    info!("Database missing, creating it");
    Postgres::create_database(database_url).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmigrated_status_has_no_version() {
        let fresh = MigrationStatus {
            applied_migrations: 0,
            latest_version: None,
        };

        assert_eq!(fresh.applied_migrations, 0);
        assert!(fresh.latest_version.is_none());
        assert_eq!(fresh.clone(), fresh);
    }

    // Everything else needs a live database; see tests/db_migrations_tests.rs
}
