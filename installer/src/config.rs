//! Installer configuration.
//!
//! Settings are layered: built-in defaults, then the configuration file,
//! then command-line flags. The file is located by `--config`, then the
//! `VENVPIN_CONFIG` environment variable, then `config.toml` in the platform
//! configuration directory. Only an explicitly named file must exist.

use crate::dirs::BaseDirs;
use crate::error::{InstallerError, Result};
use crate::exec::DEFAULT_COMMAND_TIMEOUT;
use crate::fetch::{DEFAULT_DOWNLOAD_TIMEOUT, RetryPolicy};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::time::Duration;

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "VENVPIN_CONFIG";

/// File name looked up in the platform configuration directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Retry settings as written in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    /// Attempts per archive, including the first.
    pub attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            attempts: policy.attempts,
            base_delay_ms: duration_ms(policy.base_delay),
            max_delay_ms: duration_ms(policy.max_delay),
        }
    }
}

/// Timeout settings as written in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutSettings {
    /// Whole-request timeout for one download, in seconds.
    pub download_secs: u64,
    /// Timeout for one interpreter or pip invocation, in seconds.
    pub command_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            download_secs: DEFAULT_DOWNLOAD_TIMEOUT.as_secs(),
            command_secs: DEFAULT_COMMAND_TIMEOUT.as_secs(),
        }
    }
}

/// Resolved installer settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallerConfig {
    /// Interpreter used to create environments; the plan's runtime when unset.
    pub python: Option<String>,
    /// Download cache location; the platform cache directory when unset.
    pub cache_dir: Option<Utf8PathBuf>,
    /// Whether downloads are cached.
    pub use_cache: bool,
    /// Fetch retry settings.
    pub retry: RetrySettings,
    /// Network and subprocess timeouts.
    pub timeouts: TimeoutSettings,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            python: None,
            cache_dir: None,
            use_cache: true,
            retry: RetrySettings::default(),
            timeouts: TimeoutSettings::default(),
        }
    }
}

impl InstallerConfig {
    /// Parse configuration from TOML source read from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::Config`] for invalid TOML, unknown keys, or
    /// a zero retry attempt count.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use venvpin_installer::config::InstallerConfig;
    ///
    /// let config = InstallerConfig::from_toml(
    ///     "use_cache = false\n[retry]\nattempts = 5\n",
    ///     Utf8Path::new("config.toml"),
    /// )
    /// .expect("valid configuration");
    /// assert!(!config.use_cache);
    /// assert_eq!(config.retry.attempts, 5);
    /// ```
    pub fn from_toml(source: &str, path: &Utf8Path) -> Result<Self> {
        let config: Self = toml::from_str(source).map_err(|err| InstallerError::Config {
            path: path.to_owned(),
            reason: err.message().to_owned(),
        })?;
        if config.retry.attempts == 0 {
            return Err(InstallerError::Config {
                path: path.to_owned(),
                reason: "retry.attempts must be at least 1".to_owned(),
            });
        }
        Ok(config)
    }

    /// The fetch retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry.attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    /// Whole-request download timeout.
    #[must_use]
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.download_secs)
    }

    /// Per-command subprocess timeout.
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.command_secs)
    }

    /// Apply command-line overrides on top of file values.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(python) = &overrides.python {
            self.python = Some(python.clone());
        }
        if let Some(cache_dir) = &overrides.cache_dir {
            self.cache_dir = Some(cache_dir.clone());
        }
        if overrides.no_cache {
            self.use_cache = false;
        }
        if let Some(attempts) = overrides.retries {
            self.retry.attempts = attempts;
        }
        self
    }
}

/// Settings given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// `--python`.
    pub python: Option<String>,
    /// `--cache-dir`.
    pub cache_dir: Option<Utf8PathBuf>,
    /// `--no-cache`.
    pub no_cache: bool,
    /// `--retries`.
    pub retries: Option<u32>,
}

/// Locate and load the configuration file.
///
/// `explicit` (from `--config`) and `VENVPIN_CONFIG` must name an existing
/// file; the default location is optional.
///
/// # Errors
///
/// Returns [`InstallerError::Config`] if a named file is missing, any file
/// is unreadable, or its contents are invalid.
pub fn load_config(explicit: Option<&Utf8Path>, dirs: &dyn BaseDirs) -> Result<InstallerConfig> {
    let (path, required) = match config_path(explicit, dirs)? {
        Some(found) => found,
        None => {
            log::debug!("no configuration directory; using defaults");
            return Ok(InstallerConfig::default());
        }
    };

    match std::fs::read_to_string(&path) {
        Ok(source) => {
            log::debug!("loading configuration from {path}");
            InstallerConfig::from_toml(&source, &path)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
            log::debug!("{path} not found; using defaults");
            Ok(InstallerConfig::default())
        }
        Err(err) => Err(InstallerError::Config {
            path,
            reason: err.to_string(),
        }),
    }
}

fn config_path(
    explicit: Option<&Utf8Path>,
    dirs: &dyn BaseDirs,
) -> Result<Option<(Utf8PathBuf, bool)>> {
    if let Some(path) = explicit {
        return Ok(Some((path.to_owned(), true)));
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        let path = Utf8PathBuf::from_path_buf(path.into()).map_err(|path| {
            InstallerError::Config {
                path: Utf8PathBuf::from(path.to_string_lossy().into_owned()),
                reason: format!("{CONFIG_ENV} is not valid UTF-8"),
            }
        })?;
        return Ok(Some((path, true)));
    }
    let Some(dir) = dirs.venvpin_config_dir() else {
        return Ok(None);
    };
    let dir = Utf8PathBuf::from_path_buf(dir).map_err(|dir| InstallerError::Config {
        path: Utf8PathBuf::from(dir.to_string_lossy().into_owned()),
        reason: "configuration directory is not valid UTF-8".to_owned(),
    })?;
    Ok(Some((dir.join(CONFIG_FILE), false)))
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
