//! Indexing run progress reporting.
//!
//! Reports observable progress during `carc index` so users see which root
//! is being scanned and how many files are left. Progress is emitted on
//! **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for an indexing run.
#[derive(Clone, Debug, PartialEq)]
pub enum RunProgressEvent {
    /// Walking one project root. Total unknown.
    Scanning { project: String },
    /// Adding or updating files: n processed out of total.
    Applying { n: u64, total: u64 },
    /// Removing rows for files that disappeared.
    Deleting { n: u64, total: u64 },
}

/// Reports run progress. Implementations write to stderr (human or JSON).
pub trait RunProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the run coordinator.
    fn report(&self, event: RunProgressEvent);
}

/// Human-friendly progress on stderr: "index  applying  1,234 / 5,000 files".
pub struct StderrProgress;

impl RunProgressReporter for StderrProgress {
    fn report(&self, event: RunProgressEvent) {
        let line = match &event {
            RunProgressEvent::Scanning { project } => {
                format!("index {}  scanning...\n", project)
            }
            RunProgressEvent::Applying { n, total } => format!(
                "index  applying  {} / {} files\n",
                format_number(*n),
                format_number(*total)
            ),
            RunProgressEvent::Deleting { n, total } => format!(
                "index  deleting  {} / {} files\n",
                format_number(*n),
                format_number(*total)
            ),
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl RunProgressReporter for JsonProgress {
    fn report(&self, event: RunProgressEvent) {
        let obj = match &event {
            RunProgressEvent::Scanning { project } => serde_json::json!({
                "event": "progress",
                "phase": "scanning",
                "project": project
            }),
            RunProgressEvent::Applying { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "applying",
                "n": n,
                "total": total
            }),
            RunProgressEvent::Deleting { n, total } => serde_json::json!({
                "event": "progress",
                "phase": "deleting",
                "n": n,
                "total": total
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl RunProgressReporter for NoProgress {
    fn report(&self, _event: RunProgressEvent) {}
}

pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Parse the `--progress` flag value. `auto` defers to the TTY check.
    pub fn from_flag(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(Self::default_for_tty()),
            "off" => Some(ProgressMode::Off),
            "human" => Some(ProgressMode::Human),
            "json" => Some(ProgressMode::Json),
            _ => None,
        }
    }

    pub fn reporter(&self) -> Box<dyn RunProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
