//! Item store connection pool and schema migrations

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use imgserver_core::Config;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(600);
const POOL_MAX_LIFETIME: Duration = Duration::from_secs(1800);

/// Workspace-level `migrations/` directory.
fn migrations_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../migrations")
}

fn pool_options(config: &Config) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections())
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds()))
        .idle_timeout(POOL_IDLE_TIMEOUT)
        .max_lifetime(POOL_MAX_LIFETIME)
}

/// Apply pending migrations; already applied ones are skipped.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    let dir = migrations_dir();
    let migrator = sqlx::migrate::Migrator::new(dir.clone())
        .await
        .with_context(|| format!("Failed to load migrations from {}", dir.display()))?;
    migrator
        .run(pool)
        .await
        .context("Failed to run item store migrations")?;

    tracing::info!(migrations = migrator.iter().count(), "Item store schema up to date");
    Ok(())
}

/// Connect to `DATABASE_URL` and bring the schema up to date.
pub async fn setup_database(config: &Config) -> Result<PgPool> {
    let database_url = config
        .database_url()
        .context("DATABASE_URL is required to connect to the item store")?;

    let pool = pool_options(config)
        .connect(database_url)
        .await
        .context("Failed to connect to the item store")?;
    tracing::info!(
        max_connections = config.db_max_connections(),
        acquire_timeout_secs = config.db_timeout_seconds(),
        "Item store pool ready"
    );

    run_migrations(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_pool_options_follow_config() {
        let vars = HashMap::from([("DB_MAX_CONNECTIONS", "7"), ("DB_TIMEOUT_SECONDS", "3")]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        let options = pool_options(&config);
        assert_eq!(options.get_max_connections(), 7);
        assert_eq!(options.get_acquire_timeout(), Duration::from_secs(3));
        assert_eq!(options.get_idle_timeout(), Some(POOL_IDLE_TIMEOUT));
    }

    #[test]
    fn test_migrations_dir_holds_schema() {
        let dir = migrations_dir();
        let has_sql = std::fs::read_dir(&dir)
            .unwrap()
            .any(|entry| entry.unwrap().path().extension().is_some_and(|ext| ext == "sql"));
        assert!(has_sql, "no migrations in {}", dir.display());
    }

    #[tokio::test]
    async fn test_setup_requires_database_url() {
        let config = Config::from_lookup(|_| None).unwrap();
        let err = setup_database(&config).await.unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }
}
