use crate::error::ConfigError;
use crate::models::{DEFAULT_LIMIT, MAX_LIMIT};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Static gateway configuration, read once at startup.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GatewayConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub images: ImageConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub features: FeatureConfig,
}

impl GatewayConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_node")]
    pub node: String,
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_true")]
    pub verify_certificates: bool,
    #[serde(default)]
    pub ca_bundle: Option<PathBuf>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node: default_node(),
            index: default_index(),
            api_key: None,
            username: None,
            password: None,
            verify_certificates: true,
            ca_bundle: None,
            max_retries: default_max_retries(),
            request_timeout_secs: default_request_timeout_secs(),
            health_check_interval_secs: default_health_check_interval_secs(),
        }
    }
}

impl EngineConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_image_base_url")]
    pub base_url: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            base_url: default_image_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureConfig {
    #[serde(default = "default_true")]
    pub generate_titles: bool,
    #[serde(default = "default_true")]
    pub detect_language: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            generate_titles: true,
            detect_language: true,
        }
    }
}

fn default_node() -> String {
    "http://localhost:9200".to_string()
}
fn default_index() -> String {
    "imago".to_string()
}
fn default_true() -> bool {
    true
}
fn default_max_retries() -> u32 {
    3
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_health_check_interval_secs() -> u64 {
    30
}
fn default_image_base_url() -> String {
    "https://www.imago-images.de".to_string()
}
fn default_limit() -> usize {
    DEFAULT_LIMIT
}
fn default_max_limit() -> usize {
    MAX_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = GatewayConfig::from_toml_str("").unwrap();
        assert_eq!(config.engine.node, "http://localhost:9200");
        assert_eq!(config.engine.max_retries, 3);
        assert!(config.engine.verify_certificates);
        assert_eq!(config.pagination.default_limit, 20);
        assert_eq!(config.pagination.max_limit, 100);
        assert!(config.features.generate_titles);
        assert!(config.features.detect_language);
    }

    #[test]
    fn sections_override_defaults() {
        let raw = r#"
            [engine]
            node = "https://es.internal:9200"
            index = "archive"
            api_key = "abc"
            verify_certificates = false
            request_timeout_secs = 5

            [images]
            base_url = "https://cdn.example.org"

            [features]
            detect_language = false
        "#;
        let config = GatewayConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.engine.index, "archive");
        assert_eq!(config.engine.api_key.as_deref(), Some("abc"));
        assert!(!config.engine.verify_certificates);
        assert_eq!(config.engine.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.images.base_url, "https://cdn.example.org");
        assert!(config.features.generate_titles);
        assert!(!config.features.detect_language);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let error = GatewayConfig::from_toml_str("[engine\nnode = 1").unwrap_err();
        assert!(matches!(error, ConfigError::Parse(_)));
    }
}
