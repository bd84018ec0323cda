//! Application configuration

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use reqwest::Url;
use serde::Deserialize;
use serde_with::serde_as;

use crate::errors::AisWatchError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub feed: FeedConfig,
    pub notify: NotifyConfig,
    pub store: StoreConfig,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    /// Host serving both `/ships` and `/notify`
    pub api_base: String,
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub poll_interval_ms: Duration,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub request_timeout: Duration,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotifyConfig {
    pub enabled: bool,
    #[serde(default)]
    pub ignored_mmsi: Vec<u32>,
    #[serde(default)]
    pub ignored_names: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("feed.poll_interval_ms", 600_000)?
            .set_default("feed.request_timeout", 30)?
            .set_default("notify.enabled", false)?
            .set_default("store.path", "ais-watch.db")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                Environment::with_prefix("AISWATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("notify.ignored_mmsi")
                    .with_list_parse_key("notify.ignored_names"),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), AisWatchError> {
        self.feed.validate()?;
        self.store.validate()?;
        Ok(())
    }
}

impl FeedConfig {
    pub fn validate(&self) -> Result<(), AisWatchError> {
        self.base_url()?;
        if self.poll_interval_ms.is_zero() {
            return Err(AisWatchError::ConfigurationError {
                message: "Poll interval must be greater than zero".to_string(),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(AisWatchError::ConfigurationError {
                message: "Request timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Parsed base URL, without trailing slash
    pub fn base_url(&self) -> Result<Url, AisWatchError> {
        let trimmed = self.api_base.trim().trim_end_matches('/');
        let url = Url::parse(trimmed).map_err(|e| AisWatchError::ConfigurationError {
            message: format!("Invalid API base '{}': {}", self.api_base, e),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(AisWatchError::ConfigurationError {
                message: format!("Unsupported scheme '{}' in API base", scheme),
            }),
        }
    }

    /// Feed endpoint, `{api_base}/ships`
    pub fn ships_url(&self) -> Result<String, AisWatchError> {
        Ok(format!("{}/ships", self.base_url()?.as_str().trim_end_matches('/')))
    }

    /// Notification sink, `{api_base}/notify`
    pub fn notify_url(&self) -> Result<String, AisWatchError> {
        Ok(format!("{}/notify", self.base_url()?.as_str().trim_end_matches('/')))
    }
}

impl StoreConfig {
    fn validate(&self) -> Result<(), AisWatchError> {
        if self.path.as_os_str().is_empty() {
            return Err(AisWatchError::ConfigurationError {
                message: "Store path cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}
