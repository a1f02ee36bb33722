//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the pipeline's only view of persisted
//! state: a single logical table of [`IndexedUnit`] rows, queryable by exact
//! `file_path` / `project_id` predicates and by vector similarity. There is
//! no separate manifest; the previous state for reconciliation is always
//! recomputed from [`VectorIndex::indexed_files`].
//!
//! Backends:
//! - [`memory::InMemoryIndex`] — process-local, for tests and embedding.
//! - [`sqlite::SqliteIndex`] — SQLite via sqlx, the default on-disk store.
//!
//! # Score convention
//!
//! Every backend reports `score` as cosine distance (`1 - cosine
//! similarity`). Lower is more similar, results are ordered ascending, and
//! scores are never renormalized. A stored vector whose dimension differs
//! from the query's (for example after switching embedding models) fails
//! the search instead of being scored.

pub mod memory;
pub mod sqlite;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::{IndexedFile, IndexedUnit};

/// A row returned from similarity search, with its distance to the query.
#[derive(Debug, Clone)]
pub struct ScoredUnit {
    pub unit: IndexedUnit,
    pub score: f64,
}

/// Persisted table of indexed units.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](VectorIndex::upsert) | Insert rows, creating the table on first write |
/// | [`delete_by_file_path`](VectorIndex::delete_by_file_path) | Remove every row of one file |
/// | [`search`](VectorIndex::search) | Nearest neighbours, optionally scoped to a project |
/// | [`indexed_files`](VectorIndex::indexed_files) | Distinct per-file metadata |
/// | [`count_units`](VectorIndex::count_units) | Total row count |
///
/// Before the first write the table may not exist; reads then behave as
/// if the index were empty and deletes are no-ops.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, units: &[IndexedUnit]) -> Result<()>;

    /// Returns the number of rows removed.
    async fn delete_by_file_path(&self, file_path: &str) -> Result<usize>;

    async fn search(
        &self,
        query_vec: &[f32],
        limit: usize,
        project_id: Option<&str>,
    ) -> Result<Vec<ScoredUnit>>;

    async fn indexed_files(&self) -> Result<Vec<IndexedFile>>;

    async fn count_units(&self) -> Result<usize>;
}

/// Rejects a stored vector that cannot be compared with the query.
pub(crate) fn check_dims(query_vec: &[f32], unit: &IndexedUnit) -> Result<()> {
    if unit.vector.len() != query_vec.len() {
        bail!(
            "vector dimension mismatch: query has {} dims but unit {} of {} has {}; \
             re-index after changing the embedding model",
            query_vec.len(),
            unit.id,
            unit.file_path,
            unit.vector.len()
        );
    }
    Ok(())
}
