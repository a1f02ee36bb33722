//! Project directory scanner.
//!
//! Walks a project root and returns every regular file whose name ends in
//! one of the configured extensions and whose absolute path does not
//! contain any configured exclusion substring. Exclusion is plain substring
//! containment on the full path string, not glob matching: `build` excludes
//! `/srv/app/build/x.js` and also `/srv/app/rebuild.js`.
//!
//! Unreadable entries (permission errors, dangling links, races with
//! deletion) are logged and skipped; only a missing root fails the scan.

use std::path::Path;
use std::time::SystemTime;

use tracing::warn;
use walkdir::WalkDir;

use crate::config::ProjectsConfig;
use crate::error::ScanError;
use crate::models::{normalize_project_path, FileRecord};

#[derive(Debug, Clone)]
pub struct FileScanner {
    include_extensions: Vec<String>,
    exclude_patterns: Vec<String>,
}

impl FileScanner {
    pub fn new(include_extensions: Vec<String>, exclude_patterns: Vec<String>) -> Self {
        Self {
            include_extensions,
            exclude_patterns,
        }
    }

    pub fn from_config(config: &ProjectsConfig) -> Self {
        Self::new(
            config.include_extensions.clone(),
            config.exclude_patterns.clone(),
        )
    }

    /// Scan one project root.
    ///
    /// Returned records carry absolute paths and the normalized root they
    /// were found under, sorted by path.
    pub fn scan(&self, root: &Path) -> Result<Vec<FileRecord>, ScanError> {
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let project_path = normalize_project_path(root);
        let walk_root = Path::new(&project_path);

        let mut records = Vec::new();

        // An excluded directory's descendants all contain the same
        // substring, so pruning it here is equivalent to filtering files.
        let walker = WalkDir::new(walk_root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !self.is_excluded(&e.path().to_string_lossy()));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(root = %project_path, error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if !self.matches_extension(&name) {
                continue;
            }

            let path_str = entry.path().to_string_lossy().to_string();

            let modified = match entry.metadata().map(|m| m.modified()) {
                Ok(Ok(t)) => t,
                Ok(Err(e)) => {
                    warn!(path = %path_str, error = %e, "no modification time, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(path = %path_str, error = %e, "failed to stat file, skipping");
                    continue;
                }
            };

            records.push(FileRecord {
                path: path_str,
                last_modified: system_time_to_secs(modified),
                project_path: project_path.clone(),
            });
        }

        records.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(records)
    }

    /// True if any exclusion pattern occurs anywhere in `path`.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_patterns
            .iter()
            .any(|pattern| !pattern.is_empty() && path.contains(pattern.as_str()))
    }

    fn matches_extension(&self, file_name: &str) -> bool {
        self.include_extensions
            .iter()
            .any(|ext| file_name.ends_with(ext.as_str()))
    }
}

/// Seconds since the Unix epoch, with sub-second precision.
pub fn system_time_to_secs(t: SystemTime) -> f64 {
    match t.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}
