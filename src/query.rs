//! Semantic search over the vector index.
//!
//! The query text is embedded with the same [`Embedder`] used for indexing
//! and compared against stored units by cosine distance. Scores are passed
//! through from the index unchanged: lower is more similar.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::embedding::{embed_query, Embedder};
use crate::error::QueryError;
use crate::models::{normalize_project_path, project_id, SearchResult};
use crate::store::VectorIndex;

pub const MIN_LIMIT: i64 = 1;
pub const MAX_LIMIT: i64 = 20;

/// Clamp a caller-supplied limit into `[MIN_LIMIT, MAX_LIMIT]`.
pub fn clamp_limit(limit: i64) -> usize {
    limit.clamp(MIN_LIMIT, MAX_LIMIT) as usize
}

#[derive(Clone)]
pub struct QueryEngine {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    default_limit: i64,
}

impl QueryEngine {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, default_limit: i64) -> Self {
        Self {
            embedder,
            index,
            default_limit,
        }
    }

    /// Rank stored units against `query`.
    ///
    /// `limit` defaults to the configured default and is always clamped to
    /// `[1, 20]`. `project_filter` is a project root path; it is normalized
    /// the same way roots are at index time. An empty index, or a
    /// whitespace-only query, yields an empty result rather than an error.
    pub async fn search(
        &self,
        query: &str,
        limit: Option<i64>,
        project_filter: Option<&str>,
    ) -> Result<Vec<SearchResult>, QueryError> {
        let limit = clamp_limit(limit.unwrap_or(self.default_limit));
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let project = project_filter
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| project_id(&normalize_project_path(Path::new(p))));

        let vector = embed_query(self.embedder.as_ref(), query)
            .await
            .map_err(|e| QueryError::Embed(format!("{:#}", e)))?;

        let hits = self
            .index
            .search(&vector, limit, project.as_deref())
            .await
            .map_err(|e| QueryError::Search(format!("{:#}", e)))?;

        debug!(query = %query, limit, hits = hits.len(), "search complete");

        Ok(hits
            .into_iter()
            .map(|hit| SearchResult {
                content: hit.unit.content,
                file_path: hit.unit.file_path,
                project_path: hit.unit.project_path,
                language: hit.unit.language,
                score: hit.score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_clamped() {
        assert_eq!(clamp_limit(1000), 20);
        assert_eq!(clamp_limit(20), 20);
        assert_eq!(clamp_limit(5), 5);
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(-7), 1);
    }
}
