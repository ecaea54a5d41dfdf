/// Configuration module for gocmt.
///
/// Handles loading, validating, and providing default configuration values,
/// plus the credential lookup for the annotation service.
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Environment variable holding the annotation service API key.
pub const API_KEY_ENV: &str = "MOONSHOT_API_KEY";
/// Environment variable overriding the annotation service base URL.
pub const BASE_URL_ENV: &str = "MOONSHOT_BASE_URL";

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "gocmt.json";

// ── Default value functions ──────────────────────────────────────────

fn default_concurrency() -> usize {
    1
}

fn default_base_url() -> String {
    "https://api.moonshot.cn/v1".to_string()
}

fn default_model() -> String {
    "moonshot-v1-8k".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout_secs() -> u64 {
    120
}

// ── Config structs ───────────────────────────────────────────────────

/// Which formatter canonicalizes source text.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormatterKind {
    /// `gofmt` when it is installed, otherwise the builtin normalizer.
    #[default]
    Auto,
    Gofmt,
    Builtin,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default)]
    pub formatter: FormatterKind,

    #[serde(default)]
    pub service: ServiceConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            formatter: FormatterKind::default(),
            service: ServiceConfig::default(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// A missing file yields the defaults. Invalid JSON is reported and the
    /// defaults are used instead.
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("{} not found, using defaults", config_path.display());
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(config_path)
            .with_context(|| format!("failed to read config: {}", config_path.display()))?;

        match serde_json::from_str(&data) {
            Ok(cfg) => {
                info!("Loaded configuration from {}", config_path.display());
                Ok(cfg)
            }
            Err(e) => {
                warn!("Invalid JSON in {}: {e}", config_path.display());
                warn!("Using default configuration");
                Ok(Self::default())
            }
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.concurrency > 0, "concurrency must be positive");
        anyhow::ensure!(
            self.service.max_tokens > 0,
            "service.max_tokens must be positive"
        );
        anyhow::ensure!(
            !self.service.model.trim().is_empty(),
            "service.model must not be empty"
        );
        anyhow::ensure!(
            !self.service.base_url.trim().is_empty(),
            "service.base_url must not be empty"
        );
        Ok(())
    }

    /// Apply an optional base URL override (typically from `MOONSHOT_BASE_URL`).
    pub fn apply_base_url_override(&mut self, base_url: Option<String>) {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            info!("Using annotation service base URL override: {url}");
            self.service.base_url = url;
        }
    }
}

// ── Credentials ──────────────────────────────────────────────────────

/// API credential for the annotation service.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from the value of `MOONSHOT_API_KEY`. Absence is an
    /// error.
    pub fn from_value(value: Option<String>) -> Result<Self> {
        match value {
            Some(key) if !key.trim().is_empty() => Ok(Self { api_key: key }),
            _ => anyhow::bail!("the environment variable {API_KEY_ENV} is not set"),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.formatter, FormatterKind::Auto);
        assert_eq!(config.service.base_url, "https://api.moonshot.cn/v1");
        assert_eq!(config.service.model, "moonshot-v1-8k");
        assert_eq!(config.service.max_tokens, 4096);
        assert!((config.service.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{"concurrency": 4, "formatter": "builtin", "service": {"model": "moonshot-v1-32k"}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.formatter, FormatterKind::Builtin);
        assert_eq!(config.service.model, "moonshot-v1-32k");
        // Other fields should have defaults
        assert_eq!(config.service.max_tokens, 4096);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config::load(&temp.path().join("absent.json")).unwrap();
        assert_eq!(config.concurrency, 1);
        assert!(!temp.path().join("absent.json").exists());
    }

    #[test]
    fn test_load_invalid_json_uses_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("gocmt.json");
        std::fs::write(&path, "{ concurrency: ").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn test_validate_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut config = Config::default();
        config.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_model() {
        let mut config = Config::default();
        config.service.model = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_base_url_override() {
        let mut config = Config::default();
        config.apply_base_url_override(Some("http://localhost:8080/v1".to_string()));
        assert_eq!(config.service.base_url, "http://localhost:8080/v1");

        config.apply_base_url_override(Some(String::new()));
        assert_eq!(config.service.base_url, "http://localhost:8080/v1");

        config.apply_base_url_override(None);
        assert_eq!(config.service.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_credentials_required() {
        assert!(Credentials::from_value(None).is_err());
        assert!(Credentials::from_value(Some("   ".to_string())).is_err());
        let creds = Credentials::from_value(Some("sk-test".to_string())).unwrap();
        assert_eq!(creds.api_key, "sk-test");
        assert!(!format!("{creds:?}").contains("sk-test"));
    }
}
