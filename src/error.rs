//! Typed failures for the scan, per-file, and query paths.
//!
//! The run coordinator turns these into display strings for the run's
//! error list; their `Display` output names the offending path and cause.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Project path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Project path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// Why a single file contributed zero units.
#[derive(Error, Debug)]
pub enum FileIndexError {
    #[error("Error indexing {path}: failed to read file: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error indexing {path}: failed to read metadata: {source}")]
    Metadata {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error indexing {path}: splitter failed: {cause}")]
    Split { path: String, cause: String },

    #[error("Error indexing {path}: embedding failed: {cause}")]
    Embed { path: String, cause: String },

    #[error("Error indexing {path}: expected {expected} embeddings, got {actual}")]
    EmbeddingCount {
        path: String,
        expected: usize,
        actual: usize,
    },

    #[error("Error indexing {path}: storage write failed: {cause}")]
    Store { path: String, cause: String },
}

impl FileIndexError {
    pub fn path(&self) -> &str {
        match self {
            FileIndexError::Read { path, .. }
            | FileIndexError::Metadata { path, .. }
            | FileIndexError::Split { path, .. }
            | FileIndexError::Embed { path, .. }
            | FileIndexError::EmbeddingCount { path, .. }
            | FileIndexError::Store { path, .. } => path,
        }
    }
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("failed to embed query: {0}")]
    Embed(String),

    #[error("vector search failed: {0}")]
    Search(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_errors_name_the_path() {
        let err = FileIndexError::Embed {
            path: "/srv/app/A.ts".to_string(),
            cause: "rate limited".to_string(),
        };
        assert_eq!(err.path(), "/srv/app/A.ts");
        assert_eq!(
            err.to_string(),
            "Error indexing /srv/app/A.ts: embedding failed: rate limited"
        );
    }

    #[test]
    fn scan_error_display() {
        let err = ScanError::PathNotFound(PathBuf::from("/missing"));
        assert_eq!(err.to_string(), "Project path does not exist: /missing");
    }
}
