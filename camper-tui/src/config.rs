//! Configuration loading for the camper TUI.
//!
//! All fields are required unless explicitly marked optional. No defaults.

use camper_cache::{PollConfig, PoolConfig};
use camper_core::{AccountInfo, RecordId};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TuiConfig {
    pub api_base_url: String,
    pub user_agent: String,
    pub access_token: String,
    pub request_timeout_ms: u64,
    pub refresh_interval_ms: u64,
    pub log_path: PathBuf,
    pub theme: ThemeConfig,
    pub accounts: Vec<AccountConfig>,
    pub scope: ScopeConfig,
    pub cache: CacheConfig,
    pub poll: PollIntervals,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThemeConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountConfig {
    pub id: String,
    pub name: String,
}

/// Which records the screens show.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeConfig {
    pub account_id: String,
    pub project_id: RecordId,
    pub todolist_id: RecordId,
    pub schedule_id: RecordId,
    pub questionnaire_id: RecordId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// 0 disables staleness.
    pub fresh_ttl_ms: u64,
    /// 0 keeps stale data forever.
    pub stale_ttl_ms: u64,
    pub search_debounce_ms: u64,
    pub confirm_window_ms: u64,
    pub search_result_cap: usize,
    pub max_concurrent: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollIntervals {
    pub base_ms: u64,
    pub background_ms: u64,
    pub max_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or CAMPER_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl TuiConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: TuiConfig = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(invalid("api_base_url", "must not be empty"));
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(invalid("api_base_url", "must start with http:// or https://"));
        }
        if self.user_agent.trim().is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }
        if self.access_token.trim().is_empty() {
            return Err(invalid("access_token", "must not be empty"));
        }
        if self.request_timeout_ms == 0 {
            return Err(invalid("request_timeout_ms", "must be > 0"));
        }
        if self.refresh_interval_ms == 0 {
            return Err(invalid("refresh_interval_ms", "must be > 0"));
        }
        if self.log_path.as_os_str().is_empty() {
            return Err(invalid("log_path", "must not be empty"));
        }
        if self.theme.name.to_ascii_lowercase() != "campfire" {
            return Err(invalid("theme.name", "only 'campfire' is supported"));
        }
        if self.accounts.is_empty() {
            return Err(invalid("accounts", "at least one account is required"));
        }
        if self.accounts.iter().any(|a| a.id.trim().is_empty()) {
            return Err(invalid("accounts.id", "must not be empty"));
        }
        if !self.accounts.iter().any(|a| a.id == self.scope.account_id) {
            return Err(ConfigError::InvalidValue {
                field: "scope.account_id",
                reason: format!("'{}' is not listed in accounts", self.scope.account_id),
            });
        }
        if self.cache.search_debounce_ms == 0 {
            return Err(invalid("cache.search_debounce_ms", "must be > 0"));
        }
        if self.cache.confirm_window_ms == 0 {
            return Err(invalid("cache.confirm_window_ms", "must be > 0"));
        }
        if self.cache.search_result_cap == 0 {
            return Err(invalid("cache.search_result_cap", "must be > 0"));
        }
        if self.cache.max_concurrent == 0 {
            return Err(invalid("cache.max_concurrent", "must be > 0"));
        }
        if self.poll.base_ms == 0 {
            return Err(invalid("poll.base_ms", "must be > 0"));
        }
        if self.poll.background_ms < self.poll.base_ms {
            return Err(invalid("poll.background_ms", "must be >= base_ms"));
        }
        if self.poll.max_ms < self.poll.background_ms {
            return Err(invalid("poll.max_ms", "must be >= background_ms"));
        }
        Ok(())
    }

    pub fn accounts(&self) -> Vec<AccountInfo> {
        self.accounts
            .iter()
            .map(|a| AccountInfo::new(a.id.clone(), a.name.clone()))
            .collect()
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new()
            .with_fresh_ttl(Duration::from_millis(self.cache.fresh_ttl_ms))
            .with_stale_ttl(Duration::from_millis(self.cache.stale_ttl_ms))
    }

    pub fn poll_config(&self, tag: &str) -> PollConfig {
        PollConfig {
            tag: tag.to_string(),
            base: Duration::from_millis(self.poll.base_ms),
            background: Duration::from_millis(self.poll.background_ms),
            max: Duration::from_millis(self.poll.max_ms),
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("CAMPER_CONFIG").ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
