//! Single-file indexing: read → split → embed → store.
//!
//! [`FileIndexer::index_file`] never fails past its boundary in the sense
//! that matters to a run: every failure comes back as a typed
//! [`FileIndexError`] naming the file, and no rows are written for that
//! file. The indexer only inserts. Removing a file's previous rows before
//! re-indexing it is the caller's job.
//!
//! A failed file keeps whatever `last_modified` the index already had for
//! it (or none at all), so the next run sees it as added or updated again.
//! Do not record a timestamp for a file that produced no units.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::chunk::{detect_language, ContentSplitter};
use crate::embedding::{embed_batched, Embedder};
use crate::error::FileIndexError;
use crate::models::{project_id, IndexedUnit};
use crate::scanner::system_time_to_secs;
use crate::store::VectorIndex;

/// Indexes individual files against a splitter, an embedder, and an index.
#[derive(Clone)]
pub struct FileIndexer {
    splitter: Arc<dyn ContentSplitter>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    batch_size: usize,
}

impl FileIndexer {
    pub fn new(
        splitter: Arc<dyn ContentSplitter>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        batch_size: usize,
    ) -> Self {
        Self {
            splitter,
            embedder,
            index,
            batch_size: batch_size.max(1),
        }
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Index one file found under `project_path`.
    ///
    /// Returns the number of units written. Empty or whitespace-only
    /// content writes nothing and is not an error. Invalid UTF-8 is
    /// replaced rather than rejected.
    pub async fn index_file(
        &self,
        path: &Path,
        project_path: &str,
    ) -> Result<usize, FileIndexError> {
        let path_str = path.to_string_lossy().to_string();

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| FileIndexError::Read {
                path: path_str.clone(),
                source,
            })?;
        let content = String::from_utf8_lossy(&bytes);
        if content.trim().is_empty() {
            debug!(path = %path_str, "empty file, nothing to index");
            return Ok(0);
        }

        let last_modified = tokio::fs::metadata(path)
            .await
            .and_then(|m| m.modified())
            .map(system_time_to_secs)
            .map_err(|source| FileIndexError::Metadata {
                path: path_str.clone(),
                source,
            })?;

        let pieces = self
            .splitter
            .split(path, &content)
            .map_err(|e| FileIndexError::Split {
                path: path_str.clone(),
                cause: e.to_string(),
            })?;
        if pieces.is_empty() {
            return Ok(0);
        }

        let vectors = embed_batched(self.embedder.as_ref(), &pieces, self.batch_size)
            .await
            .map_err(|e| FileIndexError::Embed {
                path: path_str.clone(),
                cause: format!("{:#}", e),
            })?;
        if vectors.len() != pieces.len() {
            return Err(FileIndexError::EmbeddingCount {
                path: path_str,
                expected: pieces.len(),
                actual: vectors.len(),
            });
        }

        let pid = project_id(project_path);
        let language = detect_language(path);

        let units: Vec<IndexedUnit> = pieces
            .into_iter()
            .zip(vectors)
            .map(|(content, vector)| IndexedUnit {
                id: Uuid::new_v4().to_string(),
                vector,
                content,
                file_path: path_str.clone(),
                project_id: pid.clone(),
                project_path: project_path.to_string(),
                language: language.to_string(),
                last_modified,
            })
            .collect();
        let written = units.len();

        self.index
            .upsert(&units)
            .await
            .map_err(|e| FileIndexError::Store {
                path: path_str.clone(),
                cause: format!("{:#}", e),
            })?;

        debug!(path = %path_str, units = written, "indexed file");
        Ok(written)
    }
}
