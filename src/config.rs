//! Viewer configuration.
//!
//! Priority: environment variables > `config.json` in the app data
//! directory > defaults.

use crate::index::IndexConfig;
use crate::parser::{Delimiter, ParserOptions};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "tabula";
const CONFIG_FILE: &str = "config.json";

/// Default rows between index flushes
pub const DEFAULT_FLUSH_ROWS: usize = 1000;

/// Default number of cached query results per document
pub const DEFAULT_QUERY_CACHE: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Rows indexed between flushes
    #[serde(default = "default_flush_rows")]
    pub flush_rows: usize,

    /// Query results kept per document (0 disables the cache)
    #[serde(default = "default_query_cache")]
    pub query_cache: usize,

    #[serde(default = "default_true")]
    pub trim_whitespace: bool,

    #[serde(default = "default_true")]
    pub skip_blank_lines: bool,

    /// Lines starting with this character are ignored
    #[serde(default)]
    pub comment: Option<char>,

    /// Encoding label for files without a byte-order mark
    #[serde(default)]
    pub encoding: Option<String>,
}

fn default_flush_rows() -> usize {
    DEFAULT_FLUSH_ROWS
}

fn default_query_cache() -> usize {
    DEFAULT_QUERY_CACHE
}

fn default_true() -> bool {
    true
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            flush_rows: default_flush_rows(),
            query_cache: default_query_cache(),
            trim_whitespace: true,
            skip_blank_lines: true,
            comment: None,
            encoding: None,
        }
    }
}

impl ViewerConfig {
    /// Load the config file (if any) and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Save to the app data directory, creating it if needed
    pub fn save(&self) -> Result<PathBuf> {
        let path = config_path().context("Could not determine app data directory")?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, content).context("Failed to write config file")?;
        Ok(path)
    }

    /// Apply `TABULA_*` overrides. Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(rows) = lookup("TABULA_FLUSH_ROWS").and_then(|v| v.parse().ok()) {
            self.flush_rows = rows;
        }
        if let Some(size) = lookup("TABULA_QUERY_CACHE").and_then(|v| v.parse().ok()) {
            self.query_cache = size;
        }
        if let Some(label) = lookup("TABULA_ENCODING") {
            let label = label.trim();
            self.encoding = (!label.is_empty()).then(|| label.to_string());
        }
    }

    /// Parser options for a file split on `delimiter`
    pub fn parser_options(&self, delimiter: Delimiter) -> ParserOptions {
        ParserOptions {
            delimiter,
            comment: self.comment,
            trim_leading_whitespace: self.trim_whitespace,
            skip_blank_lines: self.skip_blank_lines,
            encoding: self.encoding.clone(),
            ..ParserOptions::default()
        }
    }

    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            flush_interval: self.flush_rows.max(1),
        }
    }
}

/// Path of the config file in the platform data directory
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join(CONFIG_FILE))
}

fn app_data_dir() -> Option<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };
    base.map(|b| b.join(APP_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.flush_rows, 1000);
        assert_eq!(config.index_config().flush_interval, 1000);
        assert!(config.trim_whitespace);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ViewerConfig = serde_json::from_str(r##"{"comment": "#"}"##).unwrap();
        assert_eq!(config.comment, Some('#'));
        assert_eq!(config.query_cache, DEFAULT_QUERY_CACHE);
        assert!(config.skip_blank_lines);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ViewerConfig::default();
        config.apply_overrides(env(&[
            ("TABULA_FLUSH_ROWS", "250"),
            ("TABULA_QUERY_CACHE", "not a number"),
            ("TABULA_ENCODING", "shift_jis"),
        ]));
        assert_eq!(config.flush_rows, 250);
        assert_eq!(config.query_cache, DEFAULT_QUERY_CACHE);
        assert_eq!(config.encoding.as_deref(), Some("shift_jis"));
    }

    #[test]
    fn test_zero_flush_rows_is_clamped() {
        let config = ViewerConfig {
            flush_rows: 0,
            ..Default::default()
        };
        assert_eq!(config.index_config().flush_interval, 1);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"flush_rows": 10, "trim_whitespace": false}"#).unwrap();

        let config = ViewerConfig::load_from(&path).unwrap();
        assert_eq!(config.flush_rows, 10);

        let options = config.parser_options(Delimiter::Tab);
        assert_eq!(options.delimiter, Delimiter::Tab);
        assert!(!options.trim_leading_whitespace);
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ nope").unwrap();
        assert!(ViewerConfig::load_from(&path).is_err());
    }
}
