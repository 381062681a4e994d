use std::path::PathBuf;
use std::time::Duration;

use mapchange_core::instance::DEFAULT_INSTANCES_DIR;
use mapchange_core::restart::{CommandRestarter, DEFAULT_RESTART_COMMAND};
use url::Url;

/// Default seconds between poll ticks.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

/// Default pause between a verified patch and the restart.
pub const DEFAULT_SETTLE_SECS: u64 = 5;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} must be a whole number of seconds (got {value:?})")]
    InvalidSeconds { name: &'static str, value: String },

    #[error("POLL_INTERVAL_SECS must be greater than zero")]
    ZeroInterval,

    #[error("RESTART_COMMAND must not be empty")]
    EmptyRestartCommand,
}

/// Monitor configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Postgres connection string.
    pub database_url: String,
    /// Directory holding one folder per instance.
    pub instances_dir: PathBuf,
    /// Period of the poll loop.
    pub poll_interval: Duration,
    /// Pause between a verified patch and the restart (zero disables it).
    pub settle_delay: Duration,
    /// Instance-manager restart command; the folder is appended.
    pub restart_command: CommandRestarter,
}

impl MonitorConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default                          |
    /// |-----------------------|----------------------------------|
    /// | `DATABASE_URL`        | required (`NEON_DATABASE_URL` accepted) |
    /// | `INSTANCES_DIR`       | `/home/amp/.ampdata/instances`   |
    /// | `POLL_INTERVAL_SECS`  | `15`                             |
    /// | `RESTART_SETTLE_SECS` | `5`                              |
    /// | `RESTART_COMMAND`     | `sudo -u amp ampinstmgr -r`      |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = var("DATABASE_URL")
            .or_else(|| var("NEON_DATABASE_URL"))
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let instances_dir = var("INSTANCES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INSTANCES_DIR));

        let poll_interval_secs =
            parse_secs("POLL_INTERVAL_SECS", var("POLL_INTERVAL_SECS"), DEFAULT_POLL_INTERVAL_SECS)?;
        if poll_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval);
        }

        let settle_secs =
            parse_secs("RESTART_SETTLE_SECS", var("RESTART_SETTLE_SECS"), DEFAULT_SETTLE_SECS)?;

        let restart_line = lookup("RESTART_COMMAND").unwrap_or_else(|| DEFAULT_RESTART_COMMAND.into());
        let restart_command = CommandRestarter::from_command_line(&restart_line)
            .ok_or(ConfigError::EmptyRestartCommand)?;

        Ok(Self {
            database_url,
            instances_dir,
            poll_interval: Duration::from_secs(poll_interval_secs),
            settle_delay: Duration::from_secs(settle_secs),
            restart_command,
        })
    }
}

fn parse_secs(name: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidSeconds { name, value }),
    }
}

/// Connection string with the password masked, safe for logging.
pub fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                // Only fails for cannot-be-a-base URLs, which carry no password.
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => "<unparseable connection string>".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
