//! Configuration file discovery and creation.
//!
//! Lookup order:
//!
//! 1. `<config dir>/bibhunt/config.toml` (e.g. `~/.config/bibhunt/config.toml`)
//! 2. `./bibhunt.toml`
//!
//! An explicit `--config` path bypasses discovery.
//!
//! # Configuration File Format
//!
//! ```toml
//! [search]
//! sources = ["openalex", "crossref", "semanticscholar"]
//! merge_mode = "parallel"
//! max_results = 10
//! source_timeout_secs = 10
//!
//! [api_keys]
//! semantic_scholar = "your-api-key"
//! openalex_email = "you@example.org"
//!
//! [ocr]
//! command = "tesseract"
//! language = "eng"
//! timeout_secs = 30
//!
//! [history]
//! enabled = true
//! max_entries = 200
//!
//! [logging]
//! level = "info"
//! file = "/tmp/bibhunt.log"
//! ```

use std::path::{Path, PathBuf};

use super::{Config, ConfigError};

const CONFIG_FILE_NAME: &str = "config.toml";
const LOCAL_CONFIG_FILE_NAME: &str = "bibhunt.toml";

/// `<config dir>/bibhunt/config.toml`, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(env!("CARGO_PKG_NAME")).join(CONFIG_FILE_NAME))
}

/// First existing configuration file in lookup order
pub fn find_config_file() -> Option<PathBuf> {
    default_config_path()
        .into_iter()
        .chain(std::iter::once(PathBuf::from(LOCAL_CONFIG_FILE_NAME)))
        .find(|path| path.is_file())
}

impl Config {
    /// Serialize as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}

/// Write a default configuration file.
///
/// Uses `path` or the default location; refuses to overwrite unless `force`.
pub fn write_default_config(path: Option<&Path>, force: bool) -> Result<PathBuf, ConfigError> {
    let target = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path().ok_or(ConfigError::NoConfigDir)?,
    };

    if target.exists() && !force {
        return Err(ConfigError::AlreadyExists(target));
    }

    Config::default().save(&target)?;
    tracing::info!("Wrote default configuration to {}", target.display());
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;
    use crate::models::MergeMode;
    use tempfile::tempdir;

    #[test]
    fn test_write_default_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let written = write_default_config(Some(&path), false).unwrap();
        assert_eq!(written, path);

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.search.merge_mode, MergeMode::Parallel);
        assert_eq!(config.search.sources.len(), 3);
        assert_eq!(config.ocr.command, "tesseract");
    }

    #[test]
    fn test_write_default_refuses_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[search]\nmax_results = 4\n").unwrap();

        let result = write_default_config(Some(&path), false);
        assert!(matches!(result, Err(ConfigError::AlreadyExists(_))));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[search]\nmax_results = 4\n"
        );

        write_default_config(Some(&path), true).unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.search.max_results, 10);
    }

    #[test]
    fn test_save_keeps_custom_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.search.merge_mode = MergeMode::Sequential;
        config.api_keys.semantic_scholar = Some("saved-key".to_string());
        config.save(&path).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.search.merge_mode, MergeMode::Sequential);
        assert_eq!(loaded.api_keys.semantic_scholar.as_deref(), Some("saved-key"));
    }
}
