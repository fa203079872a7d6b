//! Read-only overlay configuration.
//!
//! Configuration lives at `$XDG_CONFIG_HOME/catalog-overlay/config.toml`, or
//! the platform config directory when `XDG_CONFIG_HOME` is unset:
//!
//! ```toml
//! [search]
//! syntax_highlighting = "colorful"
//! negate_marker = true
//! tag_marker = true
//! namespace_marker = true
//! history_limit = 100
//!
//! [catalog]
//! merge_duplicates = false
//! ```
//!
//! Every key is optional. A missing file means defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::search::filter::FilterGrammar;
use crate::search::highlight::SyntaxHighlightingMode;
use crate::search::history::DEFAULT_HISTORY_LIMIT;

pub const CONFIG_FILE_NAME: &str = "config.toml";
const APP_DIR: &str = "catalog-overlay";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub syntax_highlighting: SyntaxHighlightingMode,
    pub negate_marker: bool,
    pub tag_marker: bool,
    pub namespace_marker: bool,
    /// Maximum number of remembered queries.
    pub history_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            syntax_highlighting: SyntaxHighlightingMode::default(),
            negate_marker: true,
            tag_marker: true,
            namespace_marker: true,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl SearchConfig {
    pub fn grammar(&self) -> FilterGrammar {
        FilterGrammar {
            negate: self.negate_marker,
            tag: self.tag_marker,
            namespace: self.namespace_marker,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Collapse interchangeable entries into one with a summed count.
    pub merge_duplicates: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub search: SearchConfig,
    pub catalog: CatalogConfig,
}

impl OverlayConfig {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file missing; using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        // XDG_CONFIG_HOME first, so tests can redirect it.
        if let Ok(xdg_config) = dotenvy::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config).join(APP_DIR).join(CONFIG_FILE_NAME));
        }

        directories::ProjectDirs::from("dev", "catalog-overlay", APP_DIR)
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.history_limit == 0 {
            return Err(ConfigError::Validation(
                "search.history_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = OverlayConfig::parse("").unwrap();
        assert_eq!(config, OverlayConfig::default());
        assert_eq!(config.search.history_limit, 100);
        assert_eq!(config.search.syntax_highlighting, SyntaxHighlightingMode::Colorful);
        assert!(!config.catalog.merge_duplicates);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = OverlayConfig::parse(
            r#"
            [search]
            syntax_highlighting = "plain_underscored"
            tag_marker = false

            [catalog]
            merge_duplicates = true
            "#,
        )
        .unwrap();
        assert_eq!(
            config.search.syntax_highlighting,
            SyntaxHighlightingMode::PlainUnderscored
        );
        assert_eq!(
            config.search.grammar(),
            FilterGrammar {
                negate: true,
                tag: false,
                namespace: true
            }
        );
        assert!(config.catalog.merge_duplicates);
    }

    #[test]
    fn rejects_zero_history_limit() {
        let err = OverlayConfig::parse("[search]\nhistory_limit = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_unknown_mode() {
        let err = OverlayConfig::parse("[search]\nsyntax_highlighting = \"neon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_default() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = OverlayConfig::load_from(&dir.path().join("nope.toml"))?;
        assert_eq!(config, OverlayConfig::default());
        Ok(())
    }

    #[test]
    fn load_from_reads_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[search]\nhistory_limit = 7\n")?;
        assert_eq!(OverlayConfig::load_from(&path)?.search.history_limit, 7);
        Ok(())
    }
}
