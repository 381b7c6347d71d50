use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, bail};
use mission_common::StatusPolicy;
use serde::{Deserialize, Serialize};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Rotated log files older than this are deleted
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u64,

    /// Launch Library 2 base URL
    #[serde(default = "default_launch_library_url")]
    pub launch_library_url: String,

    /// api.nasa.gov (APOD, EPIC listing)
    #[serde(default = "default_nasa_api_url")]
    pub nasa_api_url: String,

    /// NASA image and video library
    #[serde(default = "default_nasa_images_url")]
    pub nasa_images_url: String,

    /// Base for EPIC image URLs handed to clients
    #[serde(default = "default_nasa_epic_archive_url")]
    pub nasa_epic_archive_url: String,

    #[serde(default = "default_nasa_api_key")]
    pub nasa_api_key: String,

    /// Launches per upcoming/previous listing
    #[serde(default = "default_launch_limit")]
    pub launch_limit: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Extra attempts after the first failed upstream request
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_apod_ttl_secs")]
    pub apod_ttl_secs: u64,

    #[serde(default = "default_epic_ttl_secs")]
    pub epic_ttl_secs: u64,

    #[serde(default)]
    pub status_policy: StatusPolicy,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_log_retention_days() -> u64 {
    3
}

fn default_launch_library_url() -> String {
    "https://ll.thespacedevs.com/2.2.0".to_string()
}

fn default_nasa_api_url() -> String {
    "https://api.nasa.gov".to_string()
}

fn default_nasa_images_url() -> String {
    "https://images-api.nasa.gov".to_string()
}

fn default_nasa_epic_archive_url() -> String {
    "https://api.nasa.gov/EPIC/archive/natural".to_string()
}

fn default_nasa_api_key() -> String {
    "DEMO_KEY".to_string()
}

fn default_launch_limit() -> u32 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_cache_ttl_secs() -> u64 {
    30 * 60
}

fn default_apod_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_epic_ttl_secs() -> u64 {
    12 * 60 * 60
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            log_retention_days: default_log_retention_days(),
            launch_library_url: default_launch_library_url(),
            nasa_api_url: default_nasa_api_url(),
            nasa_images_url: default_nasa_images_url(),
            nasa_epic_archive_url: default_nasa_epic_archive_url(),
            nasa_api_key: default_nasa_api_key(),
            launch_limit: default_launch_limit(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            apod_ttl_secs: default_apod_ttl_secs(),
            epic_ttl_secs: default_epic_ttl_secs(),
            status_policy: StatusPolicy::default(),
        }
    }
}

impl BackendConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: BackendConfig =
            toml::from_str(content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Environment variables the deployment already uses take precedence.
    pub fn apply_env_overrides<F>(&mut self, var: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = var("PORT") {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT '{}'", port))?;
        }
        if let Some(key) = var("NASA_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.nasa_api_key = key;
        }
        if let Some(url) = var("LAUNCH_LIBRARY_API_URL").filter(|u| !u.trim().is_empty()) {
            self.launch_library_url = url;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port == 0 {
            bail!("port must be non-zero");
        }
        if self.launch_limit == 0 {
            bail!("launch_limit must be at least 1");
        }
        if self.cache_ttl_secs == 0 || self.apod_ttl_secs == 0 || self.epic_ttl_secs == 0 {
            bail!("cache TTLs must be non-zero");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be non-zero");
        }
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn apod_ttl(&self) -> Duration {
        Duration::from_secs(self.apod_ttl_secs)
    }

    pub fn epic_ttl(&self) -> Duration {
        Duration::from_secs(self.epic_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

pub static CONFIG: OnceLock<BackendConfig> = OnceLock::new();

/// Load `config.toml` (or `$MISSION_CONFIG`), apply environment overrides and
/// install the result as the process-wide configuration.
pub fn read_config() -> anyhow::Result<&'static BackendConfig> {
    let path = std::env::var("MISSION_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let mut config = if Path::new(&path).exists() {
        BackendConfig::from_file(&path)?
    } else {
        tracing::warn!("Config file {} not found, using defaults", path);
        BackendConfig::default()
    };
    config.apply_env_overrides(|name| std::env::var(name).ok())?;
    config.validate()?;

    CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("Configuration already loaded"))?;
    CONFIG.get().context("Configuration missing after load")
}
