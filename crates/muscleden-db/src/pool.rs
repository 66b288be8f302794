//! Connection pools and schema setup for the plans database.

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::{Connection, Executor, PgConnection, PgPool, postgres::PgPoolOptions};
use tracing::info;

use crate::config::DbConfig;
use crate::queries::plan_records;

/// Migrations embedded at compile time from `crates/muscleden-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(ACQUIRE_TIMEOUT)
}

/// Connect a pool, failing now if the server cannot be reached.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    pool_options()
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")
}

/// Build a pool that opens its first connection on first use.
///
/// Only a malformed URL fails here. An unreachable server shows up as an
/// error from the first query, after `ACQUIRE_TIMEOUT`.
pub fn create_lazy_pool(config: &DbConfig) -> Result<PgPool> {
    pool_options()
        .connect_lazy(&config.database_url)
        .context("invalid database URL")
}

/// Run all pending embedded migrations against the pool.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;

    info!("migrations applied successfully");
    Ok(())
}

/// Create the target database through the `postgres` maintenance database
/// unless it already exists.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<()> {
    let db_name = config
        .database_name()
        .context("could not determine database name from URL")?;

    // CREATE DATABASE takes no bind parameters.
    if !db_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        anyhow::bail!("database name {db_name:?} contains invalid characters");
    }

    let mut conn = PgConnection::connect(&config.maintenance_url())
        .await
        .context("failed to connect to maintenance database")?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(&mut conn)
            .await
            .context("failed to query pg_database")?;

    if !exists {
        conn.execute(format!("CREATE DATABASE {db_name}").as_str())
            .await
            .with_context(|| format!("failed to create database {db_name}"))?;
        info!(db = db_name, "database created");
    } else {
        info!(db = db_name, "database already exists");
    }

    conn.close().await.context("failed to close maintenance connection")
}

/// What `muscleden db-init` reports once the schema is in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaStatus {
    /// Version of the newest successfully applied migration.
    pub migration_version: Option<i64>,
    /// Rows in the plans table.
    pub plan_count: i64,
}

/// Read the applied migration version and the number of stored plans.
pub async fn schema_status(pool: &PgPool) -> Result<SchemaStatus> {
    let migration_version: Option<i64> =
        sqlx::query_scalar("SELECT MAX(version) FROM _sqlx_migrations WHERE success")
            .fetch_one(pool)
            .await
            .context("failed to read applied migrations")?;

    let plan_count = plan_records::count_plan_records(pool).await?;

    Ok(SchemaStatus {
        migration_version,
        plan_count,
    })
}
