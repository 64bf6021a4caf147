//! Configuration management for eta-export using the prefer crate.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::portal::loader::DEFAULT_LOAD_TIMEOUT;
use crate::portal::pipeline::{PipelineSettings, API_BATCH_SIZE, FALLBACK_BATCH_SIZE};
use crate::scrapers::BrowserEngineConfig;

/// Landing page of the portal's document search.
pub const DEFAULT_PORTAL_URL: &str = "https://invoicing.eta.gov.eg/documents/recent";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// Page acquisition tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Pages fetched concurrently through the documents API.
    #[serde(default = "default_api_batch_size")]
    pub api_batch_size: usize,
    /// Pages rendered concurrently in background tabs.
    #[serde(default = "default_fallback_batch_size")]
    pub fallback_batch_size: usize,
    /// Time allowed for one background tab to load, in milliseconds.
    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,
    /// Pause between batches in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_delay_ms: Option<u64>,
    /// Query parameter holding the page number in portal URLs.
    #[serde(default = "default_page_param")]
    pub page_param: String,
}

fn default_api_batch_size() -> usize {
    API_BATCH_SIZE
}

fn default_fallback_batch_size() -> usize {
    FALLBACK_BATCH_SIZE
}

fn default_load_timeout_ms() -> u64 {
    DEFAULT_LOAD_TIMEOUT.as_millis() as u64
}

fn default_page_param() -> String {
    "page".to_string()
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            api_batch_size: default_api_batch_size(),
            fallback_batch_size: default_fallback_batch_size(),
            load_timeout_ms: default_load_timeout_ms(),
            batch_delay_ms: None,
            page_param: default_page_param(),
        }
    }
}

impl AcquisitionConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            api_batch_size: self.api_batch_size.max(1),
            fallback_batch_size: self.fallback_batch_size.max(1),
            batch_delay: self
                .batch_delay_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            page_param: self.page_param.clone(),
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Portal page to open when no portal tab is already open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portal_url: Option<String>,
    /// User agent string for direct API requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// Browser session settings.
    #[serde(default)]
    pub browser: BrowserEngineConfig,
    /// Page acquisition tunables.
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers eta-export config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("eta-export").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring config at {}: {}", path.display(), e);
                            Self::default_with_env()
                        }
                    }
                } else {
                    Self::default_with_env()
                }
            }
            Err(_) => Self::default_with_env(),
        }
    }

    /// Create a default config with environment variable overrides applied.
    pub fn default_with_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let path = resolve_path(&path.to_string_lossy());
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path);
        Ok(config.with_env_overrides())
    }

    /// Apply environment variable overrides.
    pub fn with_env_overrides(mut self) -> Self {
        // ETA_PORTAL_URL - portal page to attach to
        if let Ok(url) = env::var("ETA_PORTAL_URL") {
            if !url.is_empty() {
                self.portal_url = Some(url);
            }
        }

        // ETA_REMOTE_URL - DevTools endpoint of a running browser
        if let Ok(url) = env::var("ETA_REMOTE_URL") {
            if !url.is_empty() {
                self.browser.remote_url = Some(url);
            }
        }

        self
    }

    pub fn portal_url(&self) -> &str {
        self.portal_url.as_deref().unwrap_or(DEFAULT_PORTAL_URL)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT))
    }
}

/// Expand `~` in a user-supplied path.
pub fn resolve_path(path_str: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path_str).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.portal_url(), DEFAULT_PORTAL_URL);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));

        let settings = config.acquisition.pipeline_settings();
        assert_eq!(settings.api_batch_size, 10);
        assert_eq!(settings.fallback_batch_size, 5);
        assert_eq!(settings.batch_delay, None);
        assert_eq!(config.acquisition.load_timeout(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_load_toml() {
        let file = write_config(
            ".toml",
            r#"
portal_url = "https://invoicing.eta.gov.eg/documents/search"
request_timeout = 15

[browser]
headless = false

[acquisition]
fallback_batch_size = 3
batch_delay_ms = 250
"#,
        );

        let config = Config::load_from_path(file.path()).await.unwrap();
        assert_eq!(
            config.portal_url(),
            "https://invoicing.eta.gov.eg/documents/search"
        );
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert!(!config.browser.headless);
        assert_eq!(config.browser.timeout, 30);

        let settings = config.acquisition.pipeline_settings();
        assert_eq!(settings.api_batch_size, 10);
        assert_eq!(settings.fallback_batch_size, 3);
        assert_eq!(settings.batch_delay, Some(Duration::from_millis(250)));
        assert_eq!(config.source_path.as_deref(), Some(file.path()));
    }

    #[tokio::test]
    async fn test_load_yaml_and_json() {
        let yaml = write_config(".yaml", "acquisition:\n  page_param: p\n");
        let config = Config::load_from_path(yaml.path()).await.unwrap();
        assert_eq!(config.acquisition.page_param, "p");

        let json = write_config(".json", r#"{"user_agent": "Exporter/1.0"}"#);
        let config = Config::load_from_path(json.path()).await.unwrap();
        assert_eq!(config.user_agent.as_deref(), Some("Exporter/1.0"));
    }

    #[tokio::test]
    async fn test_load_invalid_reports_error() {
        let file = write_config(".toml", "request_timeout = \"soon\"");
        let err = Config::load_from_path(file.path()).await.unwrap_err();
        assert!(err.contains("TOML"));

        let err = Config::load_from_path(Path::new("/nonexistent/eta.toml"))
            .await
            .unwrap_err();
        assert!(err.contains("read"));
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        let acquisition = AcquisitionConfig {
            api_batch_size: 0,
            batch_delay_ms: Some(0),
            ..Default::default()
        };
        let settings = acquisition.pipeline_settings();
        assert_eq!(settings.api_batch_size, 1);
        assert_eq!(settings.batch_delay, None);
    }
}
