//! Server configuration

use anyhow::{Context, Result};
use classifier_lib::resolve_model_dir;
use serde::Deserialize;
use std::path::PathBuf;

/// Environment prefix for configuration variables (`PREDICTOR_API_PORT`, ...)
pub const ENV_PREFIX: &str = "PREDICTOR";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address both listeners bind to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port for the JSON API and the form UI
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Port for the Prometheus exporter
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Artifact directory; resolved from the usual candidates when unset
    #[serde(default)]
    pub model_dir: Option<PathBuf>,

    /// Reported by `/health`, read from `VERSION`
    #[serde(skip)]
    pub version: Option<String>,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8000
}

fn default_metrics_port() -> u16 {
    8001
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            api_port: default_api_port(),
            metrics_port: default_metrics_port(),
            model_dir: None,
            version: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let mut config = Self::from_source(config::Environment::with_prefix(ENV_PREFIX))?;
        config.version = std::env::var("VERSION").ok().filter(|v| !v.is_empty());
        Ok(config)
    }

    fn from_source(source: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(source)
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid PREDICTOR_* configuration")
    }

    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.api_port)
    }

    pub fn metrics_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.metrics_port)
    }

    /// Directory the artifact bundle is loaded from
    pub fn resolved_model_dir(&self) -> PathBuf {
        resolve_model_dir(self.model_dir.as_deref())
    }
}
