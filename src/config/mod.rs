//! Configuration management.
//!
//! Settings come from a TOML file layered with `BIBHUNT_*` environment
//! variables (nested keys separated by `__`, e.g.
//! `BIBHUNT_SEARCH__MERGE_MODE=sequential`). Every key has a default, so a
//! missing file is not an error.

mod file_config;

pub use file_config::{default_config_path, find_config_file, write_default_config};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{MergeMode, SearchQuery};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Source selection and merging
    #[serde(default)]
    pub search: SearchConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysConfig,

    /// Text recognition for pasted images
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Query history
    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Source identifiers in priority order
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,

    #[serde(default)]
    pub merge_mode: MergeMode,

    /// Results requested per source, and cap on the merged list
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_source_timeout")]
    pub source_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            merge_mode: MergeMode::default(),
            max_results: default_max_results(),
            source_timeout_secs: default_source_timeout(),
        }
    }
}

impl SearchConfig {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs.max(1))
    }

    /// Build a query for `text` with these settings
    pub fn query(&self, text: impl Into<String>) -> SearchQuery {
        SearchQuery::new(text)
            .sources(self.sources.iter().cloned())
            .merge_mode(self.merge_mode)
            .max_results(self.max_results)
    }
}

fn default_sources() -> Vec<String> {
    vec![
        "openalex".to_string(),
        "crossref".to_string(),
        "semanticscholar".to_string(),
    ]
}

fn default_max_results() -> usize {
    10
}

fn default_source_timeout() -> u64 {
    10
}

/// API keys for external services
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    /// Semantic Scholar API key (optional, for higher rate limits)
    #[serde(default)]
    pub semantic_scholar: Option<String>,

    /// Contact address sent to OpenAlex (polite pool)
    #[serde(default)]
    pub openalex_email: Option<String>,
}

impl ApiKeysConfig {
    /// Fill unset keys from the conventional environment variables
    fn with_env_fallbacks(mut self) -> Self {
        if self.semantic_scholar.is_none() {
            self.semantic_scholar = non_empty_env("SEMANTIC_SCHOLAR_API_KEY");
        }
        if self.openalex_email.is_none() {
            self.openalex_email = non_empty_env("OPENALEX_EMAIL");
        }
        self
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// OCR settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// OCR program, invoked as `<command> <image> stdout`
    #[serde(default = "default_ocr_command")]
    pub command: String,

    /// Language pack, passed as `-l`
    #[serde(default)]
    pub language: Option<String>,

    #[serde(default = "default_ocr_timeout")]
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: default_ocr_command(),
            language: None,
            timeout_secs: default_ocr_timeout(),
        }
    }
}

impl OcrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

fn default_ocr_command() -> String {
    "tesseract".to_string()
}

fn default_ocr_timeout() -> u64 {
    30
}

/// History settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_history_entries")]
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_history_entries(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_history_entries() -> usize {
    200
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter level when no `-v`/`-q` flag or `RUST_LOG` is given
    #[serde(default)]
    pub level: Option<String>,

    /// Log file used while the interactive console owns the terminal
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Configured log file, or `<cache dir>/bibhunt/bibhunt.log`
    pub fn file_path(&self) -> PathBuf {
        self.file.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(env!("CARGO_PKG_NAME"))
                .join("bibhunt.log")
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("{0} already exists (use --force to overwrite)")]
    AlreadyExists(PathBuf),

    #[error("No configuration directory available on this platform")]
    NoConfigDir,
}

/// Load configuration.
///
/// An explicit `path` must exist; otherwise the discovered file (if any) is
/// used. Environment variables override file values.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    match path {
        Some(path) => {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        None => {
            if let Some(found) = find_config_file() {
                tracing::debug!("Using config file {}", found.display());
                builder = builder.add_source(config::File::from(found.as_path()).required(false));
            }
        }
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix("BIBHUNT")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("search.sources")
                .try_parsing(true),
        )
        .build()?;

    let mut config: Config = settings.try_deserialize()?;
    config.api_keys = config.api_keys.with_env_fallbacks();
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(
            config.search.sources,
            vec!["openalex", "crossref", "semanticscholar"]
        );
        assert_eq!(config.search.merge_mode, MergeMode::Parallel);
        assert_eq!(config.search.max_results, 10);
        assert_eq!(config.ocr.command, "tesseract");
        assert!(config.history.enabled);
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[search]
sources = ["crossref", "openalex"]
merge_mode = "sequential"

[ocr]
language = "eng"
timeout_secs = 5

[history]
enabled = false
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.search.sources, vec!["crossref", "openalex"]);
        assert_eq!(config.search.merge_mode, MergeMode::Sequential);
        assert_eq!(config.search.max_results, 10);
        assert_eq!(config.ocr.language.as_deref(), Some("eng"));
        assert_eq!(config.ocr.timeout(), Duration::from_secs(5));
        assert!(!config.history.enabled);
        assert_eq!(config.history.max_entries, 200);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let result = load_config(Some(&dir.path().join("absent.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_merge_mode_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[search]\nmerge_mode = \"zigzag\"\n").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_query_from_settings() {
        let search = SearchConfig {
            sources: vec!["crossref".to_string()],
            merge_mode: MergeMode::Sequential,
            max_results: 3,
            source_timeout_secs: 0,
        };
        let query = search.query("attention");
        assert_eq!(query.text, "attention");
        assert_eq!(query.sources, vec!["crossref"]);
        assert_eq!(query.merge_mode, MergeMode::Sequential);
        assert_eq!(query.max_results, 3);
        assert_eq!(search.source_timeout(), Duration::from_secs(1));
    }
}
