//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// Default API endpoint when neither flag, env nor config file set one
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// CLI configuration, read from `~/.config/bcp/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// API endpoint URL
    pub api_url: Option<String>,
    /// Default artifact directory
    pub model_dir: Option<PathBuf>,
    /// Default output format
    pub default_format: Option<OutputFormat>,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Save configuration to a file
    #[cfg(test)]
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// API URL, falling back to the built-in default
    pub fn api_url(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Output format, falling back to table
    pub fn format(&self, flag: Option<OutputFormat>) -> OutputFormat {
        flag.or(self.default_format).unwrap_or_default()
    }

    /// Artifact directory from the flag or the config file, if any
    pub fn model_dir(&self, flag: Option<PathBuf>) -> Option<PathBuf> {
        flag.or_else(|| self.model_dir.clone())
    }

    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("bcp").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.api_url(None), DEFAULT_API_URL);
        assert_eq!(config.format(None), OutputFormat::Table);
        assert!(config.model_dir(None).is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            api_url: Some("http://predictor:8000".to_string()),
            model_dir: Some(PathBuf::from("/srv/model")),
            default_format: Some(OutputFormat::Json),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.api_url(None), "http://predictor:8000");
        assert_eq!(loaded.format(None), OutputFormat::Json);
        assert_eq!(loaded.model_dir(None), Some(PathBuf::from("/srv/model")));
    }

    #[test]
    fn test_flags_take_precedence() {
        let config = Config {
            api_url: Some("http://predictor:8000".to_string()),
            model_dir: Some(PathBuf::from("/srv/model")),
            default_format: Some(OutputFormat::Json),
        };
        assert_eq!(config.api_url(Some("http://other:9000")), "http://other:9000");
        assert_eq!(config.format(Some(OutputFormat::Table)), OutputFormat::Table);
        assert_eq!(
            config.model_dir(Some(PathBuf::from("local"))),
            Some(PathBuf::from("local"))
        );
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
