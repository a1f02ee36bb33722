//! Three-way diff between the indexed state and the filesystem.
//!
//! The previous state is the distinct `file_path -> last_modified`
//! projection of the vector index. The current state is the union of all
//! project scans for this run, treated as a set keyed by path. The diff is
//! always computed over the full union before anything is mutated, so a
//! file that moved between roots is re-homed rather than deleted.

use std::collections::{BTreeMap, HashMap};

use crate::models::{FileRecord, IndexedFile};

/// Modification-time differences below this many seconds are treated as
/// the same file version, absorbing filesystem timestamp granularity.
pub const MTIME_TOLERANCE_SECS: f64 = 1.0;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Reconciliation {
    /// On disk, not in the index.
    pub to_add: Vec<FileRecord>,
    /// In both, modification time moved by at least the tolerance.
    pub to_update: Vec<FileRecord>,
    /// In the index, absent from every current scan.
    pub to_delete: Vec<String>,
    /// In both and within tolerance.
    pub unchanged: usize,
}

impl Reconciliation {
    /// Number of distinct files present on disk.
    pub fn current_files(&self) -> usize {
        self.to_add.len() + self.to_update.len() + self.unchanged
    }

    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }
}

/// Collapse the indexed rows into one `path -> last_modified` entry per file.
pub fn previous_state(indexed: &[IndexedFile]) -> HashMap<String, f64> {
    indexed
        .iter()
        .map(|f| (f.file_path.clone(), f.last_modified))
        .collect()
}

pub fn is_modified(current: f64, previous: f64) -> bool {
    (current - previous).abs() >= MTIME_TOLERANCE_SECS
}

/// Compute adds, updates, and deletes.
///
/// Duplicate records for the same path collapse; the first occurrence wins,
/// so with overlapping roots the earlier configured root owns the file.
/// Output vectors are sorted by path.
pub fn diff(previous: &HashMap<String, f64>, current: &[FileRecord]) -> Reconciliation {
    let mut seen: BTreeMap<&str, &FileRecord> = BTreeMap::new();
    for record in current {
        seen.entry(record.path.as_str()).or_insert(record);
    }

    let mut result = Reconciliation::default();

    for (path, record) in &seen {
        match previous.get(*path) {
            None => result.to_add.push((*record).clone()),
            Some(&prev) if is_modified(record.last_modified, prev) => {
                result.to_update.push((*record).clone())
            }
            Some(_) => result.unchanged += 1,
        }
    }

    let mut to_delete: Vec<String> = previous
        .keys()
        .filter(|p| !seen.contains_key(p.as_str()))
        .cloned()
        .collect();
    to_delete.sort();
    result.to_delete = to_delete;

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(path: &str, mtime: f64) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            last_modified: mtime,
            project_path: "/p".to_string(),
        }
    }

    fn prev(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries.iter().map(|(p, t)| (p.to_string(), *t)).collect()
    }

    #[test]
    fn empty_index_adds_everything() {
        let d = diff(&HashMap::new(), &[rec("/p/A.ts", 10.0), rec("/p/B.java", 11.0)]);
        assert_eq!(d.to_add.len(), 2);
        assert!(d.to_update.is_empty());
        assert!(d.to_delete.is_empty());
        assert_eq!(d.current_files(), 2);
    }

    #[test]
    fn unchanged_within_tolerance() {
        let d = diff(&prev(&[("/p/A.ts", 100.0)]), &[rec("/p/A.ts", 100.5)]);
        assert!(d.is_noop());
        assert_eq!(d.unchanged, 1);
    }

    #[test]
    fn tolerance_boundary_is_inclusive() {
        let d = diff(&prev(&[("/p/A.ts", 100.0)]), &[rec("/p/A.ts", 101.0)]);
        assert_eq!(d.to_update.len(), 1);
    }

    #[test]
    fn older_mtime_also_counts_as_update() {
        let d = diff(&prev(&[("/p/A.ts", 100.0)]), &[rec("/p/A.ts", 90.0)]);
        assert_eq!(d.to_update.len(), 1);
    }

    #[test]
    fn missing_files_are_deleted() {
        let d = diff(
            &prev(&[("/p/A.ts", 1.0), ("/p/gone.ts", 1.0)]),
            &[rec("/p/A.ts", 1.0)],
        );
        assert_eq!(d.to_delete, vec!["/p/gone.ts".to_string()]);
        assert_eq!(d.unchanged, 1);
    }

    #[test]
    fn duplicate_records_collapse() {
        let d = diff(&HashMap::new(), &[rec("/p/A.ts", 1.0), rec("/p/A.ts", 1.0)]);
        assert_eq!(d.to_add.len(), 1);
    }

    #[test]
    fn first_root_owns_duplicate_path() {
        let mut second = rec("/p/A.ts", 1.0);
        second.project_path = "/q".to_string();
        let d = diff(&HashMap::new(), &[rec("/p/A.ts", 1.0), second]);
        assert_eq!(d.to_add[0].project_path, "/p");
    }

    #[test]
    fn previous_state_collapses_rows() {
        let row = |p: &str, t: f64| IndexedFile {
            file_path: p.to_string(),
            last_modified: t,
            project_path: "/p".to_string(),
            project_id: "x".to_string(),
        };
        let state = previous_state(&[row("/p/A.ts", 5.0), row("/p/A.ts", 5.0), row("/p/B.ts", 6.0)]);
        assert_eq!(state.len(), 2);
        assert_eq!(state["/p/B.ts"], 6.0);
    }
}
