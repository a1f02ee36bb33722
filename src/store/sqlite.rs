//! SQLite-backed [`VectorIndex`] implementation.
//!
//! Rows live in the `code_units` table (see [`crate::migrate`]) with the
//! vector stored as a little-endian `f32` BLOB. Similarity search loads the
//! candidate rows (all rows, or one project's via the `project_id` index)
//! and ranks them by cosine distance in process.
//!
//! The table is created lazily on the first [`upsert`](VectorIndex::upsert),
//! so reading a fresh database behaves like an empty index.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::db;
use crate::embedding::{blob_to_vec, cosine_distance, vec_to_blob};
use crate::migrate::{ensure_schema, table_exists};
use crate::models::{IndexedFile, IndexedUnit};

use super::{check_dims, ScoredUnit, VectorIndex};

pub struct SqliteIndex {
    pool: SqlitePool,
}

impl SqliteIndex {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(db::connect_path(path).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn row_to_unit(row: &SqliteRow) -> IndexedUnit {
    let blob: Vec<u8> = row.get("vector");
    IndexedUnit {
        id: row.get("id"),
        vector: blob_to_vec(&blob),
        content: row.get("content"),
        file_path: row.get("file_path"),
        project_id: row.get("project_id"),
        project_path: row.get("project_path"),
        language: row.get("language"),
        last_modified: row.get("last_modified"),
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn upsert(&self, units: &[IndexedUnit]) -> Result<()> {
        if units.is_empty() {
            return Ok(());
        }
        ensure_schema(&self.pool).await?;

        let mut tx = self.pool.begin().await?;
        for unit in units {
            sqlx::query(
                r#"
                INSERT INTO code_units (id, vector, content, file_path, project_id,
                                        project_path, language, last_modified)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    vector = excluded.vector,
                    content = excluded.content,
                    file_path = excluded.file_path,
                    project_id = excluded.project_id,
                    project_path = excluded.project_path,
                    language = excluded.language,
                    last_modified = excluded.last_modified
                "#,
            )
            .bind(&unit.id)
            .bind(vec_to_blob(&unit.vector))
            .bind(&unit.content)
            .bind(&unit.file_path)
            .bind(&unit.project_id)
            .bind(&unit.project_path)
            .bind(&unit.language)
            .bind(unit.last_modified)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_by_file_path(&self, file_path: &str) -> Result<usize> {
        if !table_exists(&self.pool).await? {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM code_units WHERE file_path = ?")
            .bind(file_path)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn search(
        &self,
        query_vec: &[f32],
        limit: usize,
        project_id: Option<&str>,
    ) -> Result<Vec<ScoredUnit>> {
        if !table_exists(&self.pool).await? {
            return Ok(Vec::new());
        }

        const COLUMNS: &str = "id, vector, content, file_path, project_id, project_path, language, last_modified";
        let rows = match project_id {
            Some(pid) => {
                sqlx::query(&format!(
                    "SELECT {} FROM code_units WHERE project_id = ?",
                    COLUMNS
                ))
                .bind(pid)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("SELECT {} FROM code_units", COLUMNS))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let mut scored: Vec<ScoredUnit> = rows
            .iter()
            .map(|row| {
                let unit = row_to_unit(row);
                check_dims(query_vec, &unit)?;
                Ok(ScoredUnit {
                    score: cosine_distance(query_vec, &unit.vector),
                    unit,
                })
            })
            .collect::<Result<_>>()?;

        scored.sort_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        Ok(scored)
    }

    async fn indexed_files(&self) -> Result<Vec<IndexedFile>> {
        if !table_exists(&self.pool).await? {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT file_path,
                   MAX(last_modified) AS last_modified,
                   MIN(project_path) AS project_path,
                   MIN(project_id) AS project_id
            FROM code_units
            GROUP BY file_path
            ORDER BY file_path
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| IndexedFile {
                file_path: row.get("file_path"),
                last_modified: row.get("last_modified"),
                project_path: row.get("project_path"),
                project_id: row.get("project_id"),
            })
            .collect())
    }

    async fn count_units(&self) -> Result<usize> {
        if !table_exists(&self.pool).await? {
            return Ok(0);
        }
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM code_units")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
