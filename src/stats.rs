//! Index statistics.
//!
//! Provides a quick summary of what's indexed: unit counts, distinct files,
//! and a per-project breakdown. Used by `carc stats` to confirm that runs
//! are picking up the expected roots.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::migrate::table_exists;

/// Per-project breakdown of file and unit counts.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectStats {
    pub project_path: String,
    pub file_count: i64,
    pub unit_count: i64,
    /// Newest file modification time, seconds since the Unix epoch.
    pub newest_modified: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexStats {
    pub total_units: i64,
    pub total_files: i64,
    pub projects: Vec<ProjectStats>,
}

/// Gather statistics from the `code_units` table. A missing table reads
/// as an empty index.
pub async fn collect_stats(pool: &SqlitePool) -> Result<IndexStats> {
    if !table_exists(pool).await? {
        return Ok(IndexStats::default());
    }

    let total_units: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM code_units")
        .fetch_one(pool)
        .await?;
    let total_files: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT file_path) FROM code_units")
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query(
        r#"
        SELECT
            project_path,
            COUNT(DISTINCT file_path) AS file_count,
            COUNT(*) AS unit_count,
            MAX(last_modified) AS newest_modified
        FROM code_units
        GROUP BY project_path
        ORDER BY unit_count DESC, project_path
        "#,
    )
    .fetch_all(pool)
    .await?;

    let projects = rows
        .iter()
        .map(|row| ProjectStats {
            project_path: row.get("project_path"),
            file_count: row.get("file_count"),
            unit_count: row.get("unit_count"),
            newest_modified: row.get("newest_modified"),
        })
        .collect();

    Ok(IndexStats {
        total_units,
        total_files,
        projects,
    })
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let stats = collect_stats(&pool).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Code Archive — Index Stats");
    println!("==========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Files:       {}", stats.total_files);
    println!("  Units:       {}", stats.total_units);

    if !stats.projects.is_empty() {
        println!();
        println!("  By project:");
        println!(
            "  {:<40} {:>6} {:>8}   {}",
            "PROJECT", "FILES", "UNITS", "NEWEST CHANGE"
        );
        println!("  {}", "-".repeat(76));

        for p in &stats.projects {
            let newest = match p.newest_modified {
                Some(ts) => format_ts_relative(ts as i64),
                None => "never".to_string(),
            };
            println!(
                "  {:<40} {:>6} {:>8}   {}",
                p.project_path, p.file_count, p.unit_count, newest
            );
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
