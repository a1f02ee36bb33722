//! Human-readable rendering of search hits and run results.
//!
//! Markdown output is what the `search_legacy_code` tool returns to agents;
//! the plain text forms are what `carc` prints on a terminal.

use std::fmt::Write;

use crate::models::{IndexingRunResult, SearchResult};

/// Shown when a search returns nothing.
pub const NO_RESULTS_HINT: &str =
    "No results. Index the codebase first with the `index_codebase` tool or `carc index`.";

/// Markdown report: one section per hit with file, project, score, and a
/// fenced code block tagged with the unit's language.
pub fn search_markdown(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return NO_RESULTS_HINT.to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "# '{}' results", query);
    let _ = writeln!(out);
    let _ = writeln!(out, "Found {} related code snippets:", results.len());
    let _ = writeln!(out);

    for (i, r) in results.iter().enumerate() {
        let _ = writeln!(out, "## Result {} - {}", i + 1, r.language.to_uppercase());
        let _ = writeln!(out, "**File:** `{}`", r.file_path);
        let _ = writeln!(out, "**Project:** `{}`", r.project_path);
        let _ = writeln!(out, "**Distance:** {:.4}", r.score);
        let _ = writeln!(out);
        let _ = writeln!(out, "```{}", r.language);
        let _ = writeln!(out, "{}", r.content);
        let _ = writeln!(out, "```");
        let _ = writeln!(out);
        let _ = writeln!(out, "---");
        let _ = writeln!(out);
    }
    out
}

/// Compact terminal listing.
pub fn search_text(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No results.\n".to_string();
    }

    let mut out = String::new();
    for (i, r) in results.iter().enumerate() {
        let _ = writeln!(out, "{}. [{:.4}] {} ({})", i + 1, r.score, r.file_path, r.language);
        let _ = writeln!(out, "    project: {}", r.project_path);
        let excerpt: String = r.content.replace('\n', " ").chars().take(160).collect();
        let _ = writeln!(out, "    excerpt: \"{}\"", excerpt.trim());
        let _ = writeln!(out);
    }
    out
}

pub fn run_text(result: &IndexingRunResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "index");
    let _ = writeln!(out, "  total files: {}", result.total_files);
    let _ = writeln!(out, "  new files: {}", result.new_files);
    let _ = writeln!(out, "  updated files: {}", result.updated_files);
    let _ = writeln!(out, "  deleted files: {}", result.deleted_files);
    let _ = writeln!(out, "  units written: {}", result.total_chunks);
    let _ = writeln!(out, "  elapsed: {:.2}s", result.elapsed_seconds);
    if !result.errors.is_empty() {
        let _ = writeln!(out, "  errors: {}", result.errors.len());
        for e in &result.errors {
            let _ = writeln!(out, "    - {}", e);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit() -> SearchResult {
        SearchResult {
            content: "public class ExcelParser {}".to_string(),
            file_path: "/srv/legacy/ExcelParser.java".to_string(),
            project_path: "/srv/legacy".to_string(),
            language: "java".to_string(),
            score: 0.123456,
        }
    }

    #[test]
    fn markdown_has_section_per_hit() {
        let md = search_markdown("excel parser", &[hit(), hit()]);
        assert!(md.starts_with("# 'excel parser' results"));
        assert!(md.contains("## Result 1 - JAVA"));
        assert!(md.contains("## Result 2 - JAVA"));
        assert!(md.contains("**Distance:** 0.1235"));
        assert!(md.contains("```java\npublic class ExcelParser {}\n```"));
    }

    #[test]
    fn empty_results_hint_at_indexing() {
        assert_eq!(search_markdown("x", &[]), NO_RESULTS_HINT);
        assert_eq!(search_text(&[]), "No results.\n");
    }

    #[test]
    fn run_text_lists_errors() {
        let result = IndexingRunResult {
            total_files: 3,
            new_files: 3,
            errors: vec!["Error indexing /p/a.ts: boom".to_string()],
            ..IndexingRunResult::default()
        };
        let text = run_text(&result);
        assert!(text.contains("new files: 3"));
        assert!(text.contains("    - Error indexing /p/a.ts: boom"));
    }
}
