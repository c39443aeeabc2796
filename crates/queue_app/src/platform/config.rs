use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use queue_core::SyncSettings;
use queue_engine::ApiSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::logging::LogDestination;

pub const CONFIG_ENV: &str = "QUEUE_SYNC_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "queue_sync.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("config field `{field}` must be greater than zero")]
    Zero { field: &'static str },
}

/// Contents of `queue_sync.ron`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub log_destination: LogDestination,
    pub cache_ttl_ms: u64,
    pub poll_interval_ms: u64,
    pub retry_delay_ms: u64,
    pub fail_safe_ms: u64,
    pub quick_refresh_ms: u64,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let sync = SyncSettings::default();
        let api = ApiSettings::default();
        Self {
            base_url: api.base_url,
            log_destination: LogDestination::default(),
            cache_ttl_ms: millis(sync.cache_ttl),
            poll_interval_ms: millis(sync.poll_interval),
            retry_delay_ms: millis(sync.retry_delay),
            fail_safe_ms: millis(sync.fail_safe),
            quick_refresh_ms: millis(sync.quick_refresh),
            connect_timeout_ms: millis(api.connect_timeout),
            request_timeout_ms: millis(api.request_timeout),
        }
    }
}

impl AppConfig {
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            cache_ttl: Duration::from_millis(self.cache_ttl_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            fail_safe: Duration::from_millis(self.fail_safe_ms),
            quick_refresh: Duration::from_millis(self.quick_refresh_ms),
        }
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.base_url.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    // A zero TTL is allowed and disables the cache.
    fn validate(self) -> Result<Self, ConfigError> {
        let required = [
            ("poll_interval_ms", self.poll_interval_ms),
            ("retry_delay_ms", self.retry_delay_ms),
            ("fail_safe_ms", self.fail_safe_ms),
            ("request_timeout_ms", self.request_timeout_ms),
        ];
        match required.into_iter().find(|(_, value)| *value == 0) {
            Some((field, _)) => Err(ConfigError::Zero { field }),
            None => Ok(self),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// `$QUEUE_SYNC_CONFIG`, or `queue_sync.ron` in the working directory.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Loads the config at `path`. A missing file is `Ok(None)`.
pub fn load(path: &Path) -> Result<Option<AppConfig>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse(&content, path).map(Some)
}

fn parse(content: &str, path: &Path) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = ron::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()
}
