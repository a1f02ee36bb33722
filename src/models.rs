//! Core data models used throughout the indexing pipeline.
//!
//! [`IndexedUnit`] is the only persisted type; everything else is produced
//! and consumed within a single run or query.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;

/// One row in the vector index: a unit of a file's text plus its embedding.
///
/// All units sharing a `file_path` carry the same `last_modified`,
/// `project_path`, `project_id`, and `language`: they are written together
/// when the file is indexed and deleted together when it changes.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedUnit {
    /// Random UUID assigned at write time.
    pub id: String,
    pub vector: Vec<f32>,
    pub content: String,
    /// Absolute path of the source file. Not unique across rows.
    pub file_path: String,
    pub project_id: String,
    pub project_path: String,
    pub language: String,
    /// Modification time in seconds since the Unix epoch.
    pub last_modified: f64,
}

/// A file found by the scanner, with the root it was found under.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub path: String,
    pub last_modified: f64,
    pub project_path: String,
}

/// Distinct per-file projection of the index, used as the previous state
/// during reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedFile {
    pub file_path: String,
    pub last_modified: f64,
    pub project_path: String,
    pub project_id: String,
}

/// Outcome of one indexing run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingRunResult {
    pub total_files: usize,
    /// Files with no rows in the index that were handed to the indexer,
    /// including ones that then failed. Empty or whitespace-only files
    /// write no rows, so they are counted here on every run.
    pub new_files: usize,
    pub updated_files: usize,
    pub deleted_files: usize,
    pub total_chunks: usize,
    pub elapsed_seconds: f64,
    pub errors: Vec<String>,
}

/// A ranked search hit.
///
/// `score` is the cosine distance reported by the vector index: lower
/// means more similar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub content: String,
    pub file_path: String,
    pub project_path: String,
    pub language: String,
    pub score: f64,
}

/// Stable identifier for a project root: hex SHA-256 of its path string.
pub fn project_id(project_path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(project_path.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Canonical string form of a project root.
///
/// Existing directories are canonicalized so that `./app`, `/srv/app/` and
/// `/srv/app` all map to one project id. Paths that cannot be resolved keep
/// their literal spelling.
pub fn normalize_project_path(path: &Path) -> String {
    match std::fs::canonicalize(path) {
        Ok(p) => p.to_string_lossy().to_string(),
        Err(_) => path.to_string_lossy().to_string(),
    }
}
