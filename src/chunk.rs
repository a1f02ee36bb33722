//! Language-aware recursive text splitter.
//!
//! Splits file content into bounded-size units. The separator list is chosen
//! by the language detected from the file extension: declaration and
//! control-flow keywords first, then blank lines, lines, words, and finally
//! single characters. Pieces are merged back up to `chunk_size` characters,
//! carrying up to `chunk_overlap` characters of trailing context into the
//! next unit.
//!
//! The indexing pipeline depends only on [`ContentSplitter`]; this splitter
//! is the default implementation.

use std::collections::VecDeque;
use std::path::Path;

use anyhow::Result;

use crate::config::ChunkingConfig;

/// Converts a file's text into an ordered sequence of units.
pub trait ContentSplitter: Send + Sync {
    fn split(&self, path: &Path, content: &str) -> Result<Vec<String>>;
}

const JAVA_SEPARATORS: &[&str] = &[
    "\nclass ",
    "\npublic ",
    "\nprotected ",
    "\nprivate ",
    "\nstatic ",
    "\nif ",
    "\nfor ",
    "\nwhile ",
    "\nswitch ",
    "\ncase ",
    "\n\n",
    "\n",
    " ",
    "",
];

const JS_SEPARATORS: &[&str] = &[
    "\nfunction ",
    "\nconst ",
    "\nlet ",
    "\nvar ",
    "\nclass ",
    "\nif ",
    "\nfor ",
    "\nwhile ",
    "\nswitch ",
    "\ncase ",
    "\ndefault ",
    "\n\n",
    "\n",
    " ",
    "",
];

const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Language tag for a file path, from its extension.
///
/// TypeScript and Vue single-file components share the JavaScript
/// separators but keep their own tag.
pub fn detect_language(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "java" => "java",
        "js" | "jsx" => "js",
        "ts" | "tsx" => "ts",
        "vue" => "vue",
        _ => "default",
    }
}

fn separators_for(language: &str) -> &'static [&'static str] {
    match language {
        "java" => JAVA_SEPARATORS,
        "js" | "ts" | "vue" => JS_SEPARATORS,
        _ => DEFAULT_SEPARATORS,
    }
}

#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split `text` using the separators for `language`.
    pub fn split_text(&self, text: &str, language: &str) -> Vec<String> {
        self.split_recursive(text, separators_for(language))
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut sep_idx = separators.len().saturating_sub(1);
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() || text.contains(sep) {
                sep_idx = i;
                break;
            }
        }
        let separator = separators.get(sep_idx).copied().unwrap_or("");
        let remaining = separators.get(sep_idx + 1..).unwrap_or(&[]);

        let mut out = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();

        for piece in split_keep_separator(text, separator) {
            if char_len(piece) <= self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                out.extend(self.merge(&fitting));
                fitting.clear();
            }
            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    out.push(trimmed.to_string());
                }
            } else {
                out.extend(self.split_recursive(piece, remaining));
            }
        }

        if !fitting.is_empty() {
            out.extend(self.merge(&fitting));
        }

        out
    }

    /// Greedily merge pieces into units of at most `chunk_size` characters.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut units = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                push_unit(&mut units, &window);
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += len;
        }

        push_unit(&mut units, &window);
        units
    }
}

impl ContentSplitter for RecursiveSplitter {
    fn split(&self, path: &Path, content: &str) -> Result<Vec<String>> {
        Ok(self.split_text(content, detect_language(path)))
    }
}

fn push_unit(units: &mut Vec<String>, window: &VecDeque<&str>) {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        units.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split on `separator`, keeping it at the start of the following piece.
/// An empty separator splits into single characters.
fn split_keep_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n)
            .map(|i| format!("word{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn detects_languages() {
        assert_eq!(detect_language(Path::new("/a/App.java")), "java");
        assert_eq!(detect_language(Path::new("/a/x.jsx")), "js");
        assert_eq!(detect_language(Path::new("/a/x.TS")), "ts");
        assert_eq!(detect_language(Path::new("/a/x.tsx")), "ts");
        assert_eq!(detect_language(Path::new("/a/Comp.vue")), "vue");
        assert_eq!(detect_language(Path::new("/a/notes.md")), "default");
        assert_eq!(detect_language(Path::new("/a/Makefile")), "default");
    }

    #[test]
    fn small_text_single_unit() {
        let splitter = RecursiveSplitter::new(1000, 200);
        let units = splitter
            .split(Path::new("A.ts"), "export const x = 1;\n")
            .unwrap();
        assert_eq!(units, vec!["export const x = 1;"]);
    }

    #[test]
    fn whitespace_only_yields_nothing() {
        let splitter = RecursiveSplitter::new(100, 10);
        assert!(splitter.split_text("   \n\n  \t", "default").is_empty());
    }

    #[test]
    fn units_respect_chunk_size() {
        let splitter = RecursiveSplitter::new(50, 10);
        let text = words(200);
        let units = splitter.split_text(&text, "default");
        assert!(units.len() > 1);
        for u in &units {
            assert!(u.chars().count() <= 50, "unit too long: {}", u);
        }
        assert!(units[0].starts_with("word0"));
        assert!(units.last().unwrap().ends_with("word199"));
    }

    #[test]
    fn consecutive_units_overlap() {
        let splitter = RecursiveSplitter::new(50, 20);
        let units = splitter.split_text(&words(100), "default");
        for pair in units.windows(2) {
            let first_word = pair[1].split_whitespace().next().unwrap();
            assert!(
                pair[0].split_whitespace().any(|w| w == first_word),
                "no overlap between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn java_splits_on_declarations() {
        let splitter = RecursiveSplitter::new(60, 0);
        let text = "package a;\n\npublic class A {\n  int x;\n}\nclass B {\n  int y;\n}\nclass C {\n  int z;\n}";
        let units = splitter.split(Path::new("A.java"), text).unwrap();
        assert!(units.len() >= 2);
        assert!(units.iter().any(|u| u.starts_with("class B") || u.contains("class B")));
        for u in &units {
            assert!(u.chars().count() <= 60);
        }
    }

    #[test]
    fn oversized_token_is_hard_split() {
        let splitter = RecursiveSplitter::new(10, 0);
        let units = splitter.split_text(&"x".repeat(35), "default");
        assert_eq!(units.len(), 4);
        assert!(units.iter().all(|u| u.chars().count() <= 10));
    }

    #[test]
    fn multibyte_text_is_safe() {
        let splitter = RecursiveSplitter::new(5, 1);
        let units = splitter.split_text("안녕하세요 세계 코드 검색", "default");
        assert!(!units.is_empty());
        for u in &units {
            assert!(u.chars().count() <= 5);
        }
    }
}
