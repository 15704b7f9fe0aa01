//! Log output for the TUI.
//!
//! The terminal belongs to the UI, so logs go to the configured file.
//! Verbosity comes from `CAMPER_LOG` and defaults to `info`.

use crate::config::TuiConfig;
use crate::error::TuiError;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "CAMPER_LOG";

pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Call once, before the terminal is taken over.
pub fn init(config: &TuiConfig) -> Result<(), TuiError> {
    if let Some(parent) = config.log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|err| TuiError::Logging(err.to_string()))?;

    tracing::info!(log_path = %config.log_path.display(), "logging initialized");
    Ok(())
}
