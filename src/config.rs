//! TOML configuration parsing, environment overrides, and validation.
//!
//! The configuration is loaded once at startup and passed by reference into
//! every component. Missing required settings are fatal here so the
//! indexing pipeline never has to deal with them.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub projects: ProjectsConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub indexing: IndexingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Project roots and the file filters applied while scanning them.
#[derive(Debug, Deserialize, Clone)]
pub struct ProjectsConfig {
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    #[serde(default = "default_include_extensions")]
    pub include_extensions: Vec<String>,
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

fn default_include_extensions() -> Vec<String> {
    [".ts", ".js", ".vue", ".java"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_exclude_patterns() -> Vec<String> {
    [
        "node_modules",
        "dist",
        ".git",
        "__pycache__",
        "build",
        "target",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            url: None,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    100
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexingConfig {
    /// Upper bound on files processed concurrently within one run.
    #[serde(default = "default_max_concurrent_files")]
    pub max_concurrent_files: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            max_concurrent_files: default_max_concurrent_files(),
        }
    }
}

fn default_max_concurrent_files() -> usize {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_limit")]
    pub default_limit: i64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

fn default_limit() -> i64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

/// Load, override from the environment, and validate a configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    normalize(&mut config);
    validate(&config)?;

    Ok(config)
}

/// Apply comma-separated environment overrides.
///
/// `lookup` is injected so tests don't have to mutate the process environment.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("PROJECT_PATHS") {
        config.projects.paths = split_list(&v).into_iter().map(PathBuf::from).collect();
    }
    if let Some(v) = lookup("INCLUDED_EXTENSIONS") {
        config.projects.include_extensions = split_list(&v);
    }
    if let Some(v) = lookup("EXCLUDE_PATTERNS") {
        config.projects.exclude_patterns = split_list(&v);
    }
    if let Some(v) = lookup("CODE_ARCHIVE_DB_PATH") {
        if !v.trim().is_empty() {
            config.db.path = PathBuf::from(v.trim());
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize(config: &mut Config) {
    for ext in config.projects.include_extensions.iter_mut() {
        if !ext.starts_with('.') {
            *ext = format!(".{}", ext);
        }
    }
}

pub fn validate(config: &Config) -> Result<()> {
    if config.projects.paths.is_empty() {
        anyhow::bail!("projects.paths must list at least one project root (or set PROJECT_PATHS)");
    }

    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.chunk_overlap must be smaller than chunking.chunk_size");
    }

    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }
    if config.indexing.max_concurrent_files == 0 {
        anyhow::bail!("indexing.max_concurrent_files must be >= 1");
    }

    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" | "local" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
            other
        ),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(toml_str: &str) -> Config {
        let mut config: Config = toml::from_str(toml_str).unwrap();
        normalize(&mut config);
        config
    }

    const MINIMAL: &str = r#"
[db]
path = "/tmp/archive.sqlite"

[projects]
paths = ["/srv/legacy"]
"#;

    #[test]
    fn defaults_match_legacy_layout() {
        let config = parse(MINIMAL);
        assert_eq!(
            config.projects.include_extensions,
            vec![".ts", ".js", ".vue", ".java"]
        );
        assert!(config
            .projects
            .exclude_patterns
            .contains(&"node_modules".to_string()));
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.embedding.batch_size, 100);
        assert_eq!(config.indexing.max_concurrent_files, 1);
        assert_eq!(config.retrieval.default_limit, 5);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn missing_project_paths_is_fatal() {
        let config = parse("[db]\npath = \"/tmp/a.sqlite\"\n\n[projects]\n");
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("projects.paths"));
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let mut config = parse(MINIMAL);
        config.chunking.chunk_overlap = 1000;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn enabled_provider_requires_model_and_dims() {
        let mut config = parse(MINIMAL);
        config.embedding.provider = "openai".to_string();
        assert!(validate(&config).is_err());
        config.embedding.model = Some("text-embedding-3-small".to_string());
        config.embedding.dims = Some(1536);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn unknown_provider_rejected() {
        let mut config = parse(MINIMAL);
        config.embedding.provider = "cohere".to_string();
        config.embedding.model = Some("m".to_string());
        config.embedding.dims = Some(8);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn env_overrides_split_on_commas() {
        let mut config = parse(MINIMAL);
        let env: HashMap<&str, &str> = [
            ("PROJECT_PATHS", " /a , /b ,, "),
            ("INCLUDED_EXTENSIONS", "java,ts"),
            ("EXCLUDE_PATTERNS", "vendor"),
        ]
        .into_iter()
        .collect();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));
        normalize(&mut config);

        assert_eq!(
            config.projects.paths,
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
        assert_eq!(config.projects.include_extensions, vec![".java", ".ts"]);
        assert_eq!(config.projects.exclude_patterns, vec!["vendor"]);
    }
}
