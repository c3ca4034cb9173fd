/// Embedded schema migrations
///
/// SQL files live in `tallybook-shared/migrations/` and are compiled into the
/// binary with `sqlx::migrate!`. The API runs them on startup; the seed
/// binary also creates the database first when it is missing.
///
/// # Example
///
/// ```no_run
/// use tallybook_shared::db::migrations::{ensure_database_exists, run_migrations};
/// use tallybook_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example(url: String) -> Result<(), Box<dyn std::error::Error>> {
/// ensure_database_exists(&url).await?;
/// let pool = create_pool(DatabaseConfig { url, ..Default::default() }).await?;
/// run_migrations(&pool).await?;
/// # Ok(())
/// # }
/// ```

use sqlx::{migrate::MigrateDatabase, postgres::PgPool, Postgres};
use tracing::{error, info};

/// Applied-migration summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied: usize,
    pub latest_version: Option<i64>,

    /// Number of migrations embedded in this binary
    pub known: usize,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.applied >= self.known
    }
}

/// Applies every pending migration
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    let migrator = sqlx::migrate!("./migrations");
    info!(known = migrator.iter().count(), "Running database migrations");

    migrator.run(pool).await.map_err(|e| {
        error!(error = %e, "Migration failed");
        e
    })?;

    info!("Database migrations complete");
    Ok(())
}

/// Reads `_sqlx_migrations` and compares it with the embedded set
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let known = sqlx::migrate!("./migrations").iter().count();

    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = 'public' AND table_name = '_sqlx_migrations'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(MigrationStatus {
            applied: 0,
            latest_version: None,
            known,
        });
    }

    let (applied, latest_version): (i64, Option<i64>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success = true",
    )
    .fetch_one(pool)
    .await?;

    Ok(MigrationStatus {
        applied: applied as usize,
        latest_version,
        known,
    })
}

/// Creates the database named in `database_url` if it does not exist
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if !Postgres::database_exists(database_url).await? {
        info!("Database does not exist, creating it");
        Postgres::create_database(database_url).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_migrations_are_ordered() {
        let migrator = sqlx::migrate!("./migrations");
        let versions: Vec<i64> = migrator.iter().map(|m| m.version).collect();

        assert_eq!(versions.len(), 4);
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_status_up_to_date() {
        let status = MigrationStatus {
            applied: 4,
            latest_version: Some(20250101000004),
            known: 4,
        };
        assert!(status.is_up_to_date());
        assert!(!MigrationStatus { applied: 3, ..status }.is_up_to_date());
    }
}
