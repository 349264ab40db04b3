use oxsplunk_common::metrics::MetricsSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection and collection settings for one Splunk Enterprise instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Management API base URL, e.g. `https://splunk.internal:8089`
    pub endpoint: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Upper bound on how long a search job may be polled before giving up
    #[serde(default = "default_max_search_wait_secs")]
    pub max_search_wait_secs: u64,
    /// Per-request HTTP timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub metrics: MetricsSettings,
}

fn default_max_search_wait_secs() -> u64 {
    60
}

fn default_timeout_secs() -> u64 {
    60
}

/// Invalid scraper configuration.
#[derive(Debug, thiserror::Error)]
#[error("Configuration error: {0}")]
pub struct ConfigError(pub String);

impl ScraperConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: String::new(),
            password: String::new(),
            max_search_wait_secs: default_max_search_wait_secs(),
            timeout_secs: default_timeout_secs(),
            metrics: MetricsSettings::default(),
        }
    }

    pub fn max_search_wait(&self) -> Duration {
        Duration::from_secs(self.max_search_wait_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if the endpoint is missing or is not an
    /// http(s) URL, or if either duration is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ConfigError("endpoint must be specified".to_string()));
        }
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError(format!(
                "endpoint must use http or https: {endpoint}"
            )));
        }
        if self.max_search_wait_secs == 0 {
            return Err(ConfigError(
                "max_search_wait_secs must be greater than zero".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError("timeout_secs must be greater than zero".to_string()));
        }
        Ok(())
    }
}
