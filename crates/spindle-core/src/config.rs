//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::domain::ConfigError;

pub const ENV_WORKER_BIN: &str = "SPINDLE_WORKER_BIN";
pub const ENV_WORKER_TIMEOUT_SECS: &str = "SPINDLE_WORKER_TIMEOUT_SECS";
pub const ENV_LOG: &str = "SPINDLE_LOG";

/// Scheduler-side settings for spawning workers.
#[derive(Debug, Clone, PartialEq)]
pub struct LauncherConfig {
    /// Worker executable.
    pub program: PathBuf,
    /// Kill the worker after this long. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Passed to the worker as `--log`.
    pub log_filter: Option<String>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("spindle-worker"),
            timeout: None,
            log_filter: None,
        }
    }
}

impl LauncherConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(program) = lookup(ENV_WORKER_BIN) {
            config.program = PathBuf::from(program);
        }
        if let Some(raw) = lookup(ENV_WORKER_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: ENV_WORKER_TIMEOUT_SECS.to_string(),
                message: format!("{raw:?}: {e}"),
            })?;
            // 0 means no limit
            config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        config.log_filter = lookup(ENV_LOG);
        Ok(config)
    }
}
