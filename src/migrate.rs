use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Name of the single table holding every indexed unit.
pub const UNITS_TABLE: &str = "code_units";

/// Create the database file and schema. Idempotent.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    ensure_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS code_units (
            id TEXT PRIMARY KEY,
            vector BLOB NOT NULL,
            content TEXT NOT NULL,
            file_path TEXT NOT NULL,
            project_id TEXT NOT NULL,
            project_path TEXT NOT NULL,
            language TEXT NOT NULL,
            last_modified REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_code_units_file_path ON code_units(file_path)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_code_units_project_id ON code_units(project_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Whether the units table has been created yet.
pub async fn table_exists(pool: &SqlitePool) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name = ?",
    )
    .bind(UNITS_TABLE)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}
