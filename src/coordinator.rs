//! Indexing run orchestration.
//!
//! A run walks a fixed sequence of phases:
//!
//! ```text
//! Idle → Scanning → Diffing → Applying → ReconcilingDeletes → Done
//! ```
//!
//! - **Scanning**: every configured root is scanned. A root that fails is
//!   recorded as `Error scanning project <root>: <cause>` and skipped.
//! - **Diffing**: the union of all scans is diffed against the index's
//!   distinct `file_path -> last_modified` projection. Nothing is mutated
//!   before the whole diff is known.
//! - **Applying**: added and updated files are indexed through
//!   [`FileIndexer`], at most `indexing.max_concurrent_files` at a time.
//!   An updated file's old rows are deleted inside the same task, right
//!   before it is re-indexed, so no two writers touch one path.
//! - **ReconcilingDeletes**: rows of files gone from every root are removed.
//!
//! `Done` is always reached. Per-file and per-root failures end up in
//! [`IndexingRunResult::errors`]; nothing is retried within a run. Overlapping
//! calls to [`RunCoordinator::run`] on one coordinator are serialized.

use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::FileIndexError;
use crate::indexer::FileIndexer;
use crate::models::{FileRecord, IndexingRunResult};
use crate::progress::{NoProgress, RunProgressEvent, RunProgressReporter};
use crate::reconcile::{self, Reconciliation};
use crate::scanner::FileScanner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Scanning,
    Diffing,
    Applying,
    ReconcilingDeletes,
    Done,
}

/// Scan and diff results, before anything is written.
#[derive(Debug, Clone, Default)]
pub struct RunPlan {
    pub reconciliation: Reconciliation,
    /// Distinct files found across all roots.
    pub total_files: usize,
    pub errors: Vec<String>,
    /// False when the index could not be read; such a plan is never applied.
    pub state_readable: bool,
}

#[derive(Debug, Clone, Copy)]
enum ChangeKind {
    Add,
    Update,
}

struct FileOutcome {
    kind: ChangeKind,
    /// False when the file was never handed to the indexer.
    attempted: bool,
    result: Result<usize, FileIndexError>,
}

pub struct RunCoordinator {
    roots: Vec<PathBuf>,
    scanner: FileScanner,
    indexer: FileIndexer,
    max_concurrent_files: usize,
    progress: Arc<dyn RunProgressReporter>,
    run_lock: Mutex<()>,
    phase: StdMutex<RunPhase>,
}

impl RunCoordinator {
    pub fn new(
        roots: Vec<PathBuf>,
        scanner: FileScanner,
        indexer: FileIndexer,
        max_concurrent_files: usize,
    ) -> Self {
        Self {
            roots,
            scanner,
            indexer,
            max_concurrent_files: max_concurrent_files.max(1),
            progress: Arc::new(NoProgress),
            run_lock: Mutex::new(()),
            phase: StdMutex::new(RunPhase::Idle),
        }
    }

    pub fn from_config(config: &Config, indexer: FileIndexer) -> Self {
        Self::new(
            config.projects.paths.clone(),
            FileScanner::from_config(&config.projects),
            indexer,
            config.indexing.max_concurrent_files,
        )
    }

    pub fn with_progress(mut self, progress: Arc<dyn RunProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Phase of the run in progress, or `Done`/`Idle` between runs.
    pub fn phase(&self) -> RunPhase {
        *self.phase.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn enter(&self, phase: RunPhase) {
        *self.phase.lock().unwrap_or_else(|p| p.into_inner()) = phase;
        info!(phase = ?phase, "indexing run phase");
    }

    /// Scan all roots and diff against the index without writing anything.
    pub async fn plan(&self) -> RunPlan {
        let _guard = self.run_lock.lock().await;
        let plan = self.scan_and_diff().await;
        self.enter(RunPhase::Idle);
        plan
    }

    async fn scan_and_diff(&self) -> RunPlan {
        let mut plan = RunPlan {
            state_readable: true,
            ..RunPlan::default()
        };

        self.enter(RunPhase::Scanning);
        let mut current: Vec<FileRecord> = Vec::new();
        for root in &self.roots {
            self.progress.report(RunProgressEvent::Scanning {
                project: root.display().to_string(),
            });
            match self.scanner.scan(root) {
                Ok(records) => {
                    info!(root = %root.display(), files = records.len(), "scanned project");
                    current.extend(records);
                }
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "project scan failed");
                    plan.errors
                        .push(format!("Error scanning project {}: {}", root.display(), e));
                }
            }
        }

        self.enter(RunPhase::Diffing);
        let indexed = match self.indexer.index().indexed_files().await {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "failed to read index state");
                plan.errors
                    .push(format!("Error reading index state: {:#}", e));
                plan.state_readable = false;
                Vec::new()
            }
        };
        let previous = reconcile::previous_state(&indexed);
        plan.reconciliation = reconcile::diff(&previous, &current);
        plan.total_files = plan.reconciliation.current_files();

        info!(
            add = plan.reconciliation.to_add.len(),
            update = plan.reconciliation.to_update.len(),
            delete = plan.reconciliation.to_delete.len(),
            unchanged = plan.reconciliation.unchanged,
            "reconciliation computed"
        );

        if !plan.state_readable {
            plan.reconciliation = Reconciliation {
                unchanged: plan.total_files,
                ..Reconciliation::default()
            };
        }
        plan
    }

    /// Run one full indexing pass.
    pub async fn run(&self) -> IndexingRunResult {
        let _guard = self.run_lock.lock().await;
        let started = Instant::now();

        let plan = self.scan_and_diff().await;
        let mut result = IndexingRunResult {
            total_files: plan.total_files,
            errors: plan.errors,
            ..IndexingRunResult::default()
        };
        let Reconciliation {
            to_add,
            to_update,
            to_delete,
            ..
        } = plan.reconciliation;

        self.enter(RunPhase::Applying);
        let total = (to_add.len() + to_update.len()) as u64;
        let jobs = to_add
            .into_iter()
            .map(|r| (r, ChangeKind::Add))
            .chain(to_update.into_iter().map(|r| (r, ChangeKind::Update)));

        let mut outcomes = stream::iter(jobs)
            .map(|(record, kind)| self.apply_one(record, kind))
            .buffer_unordered(self.max_concurrent_files);

        let mut done = 0u64;
        while let Some(outcome) = outcomes.next().await {
            done += 1;
            self.progress
                .report(RunProgressEvent::Applying { n: done, total });

            if outcome.attempted {
                match outcome.kind {
                    ChangeKind::Add => result.new_files += 1,
                    ChangeKind::Update => result.updated_files += 1,
                }
            }
            match outcome.result {
                Ok(units) => result.total_chunks += units,
                Err(e) => {
                    warn!(path = %e.path(), error = %e, "file indexing failed");
                    result.errors.push(e.to_string());
                }
            }
        }
        drop(outcomes);

        self.enter(RunPhase::ReconcilingDeletes);
        let total = to_delete.len() as u64;
        for (i, path) in to_delete.iter().enumerate() {
            self.progress.report(RunProgressEvent::Deleting {
                n: i as u64 + 1,
                total,
            });
            match self.indexer.index().delete_by_file_path(path).await {
                Ok(_) => result.deleted_files += 1,
                Err(e) => {
                    warn!(path = %path, error = %e, "delete failed");
                    result.errors.push(format!("Error deleting {}: {:#}", path, e));
                }
            }
        }

        result.elapsed_seconds = started.elapsed().as_secs_f64();
        self.enter(RunPhase::Done);
        info!(
            total_files = result.total_files,
            new_files = result.new_files,
            updated_files = result.updated_files,
            deleted_files = result.deleted_files,
            total_chunks = result.total_chunks,
            errors = result.errors.len(),
            elapsed_seconds = result.elapsed_seconds,
            "indexing run finished"
        );
        result
    }

    async fn apply_one(&self, record: FileRecord, kind: ChangeKind) -> FileOutcome {
        if let ChangeKind::Update = kind {
            if let Err(e) = self.indexer.index().delete_by_file_path(&record.path).await {
                return FileOutcome {
                    kind,
                    attempted: false,
                    result: Err(FileIndexError::Store {
                        path: record.path,
                        cause: format!("failed to remove stale units: {:#}", e),
                    }),
                };
            }
        }

        let result = self
            .indexer
            .index_file(std::path::Path::new(&record.path), &record.project_path)
            .await;
        FileOutcome {
            kind,
            attempted: true,
            result,
        }
    }
}
