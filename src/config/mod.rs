//! Run configuration.
//!
//! Settings are layered, later sources winning:
//!
//! 1. built-in defaults,
//! 2. the JSON config file,
//! 3. environment variables (`TRMNL_WEBHOOK_URL`, `DOCKER_HOST`,
//!    `DOCKER_API_VERSION`, `SHOW_STOPPED`, `CPU_THRESHOLD`,
//!    `MEMORY_THRESHOLD`, `SORT_BY`, `SORT_ORDER`),
//! 4. command line flags.
//!
//! The resulting [`Config`] is built once at startup and never changes
//! during the run.
mod error;
mod file;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

pub use error::{Error, Result};
pub use file::FileConfig;

use crate::alert::Thresholds;

pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";
pub const DEFAULT_API_VERSION: &str = "1.41";
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;

/// Field the container list is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Cpu,
    Memory,
    Name,
    Status,
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(SortKey::Cpu),
            "memory" => Ok(SortKey::Memory),
            "name" => Ok(SortKey::Name),
            "status" => Ok(SortKey::Status),
            _ => Err(Error::InvalidValue {
                key: "sort_by",
                value: s.to_owned(),
                reason: "expected one of cpu, memory, name, status",
            }),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortKey::Cpu => "cpu",
            SortKey::Memory => "memory",
            SortKey::Name => "name",
            SortKey::Status => "status",
        })
    }
}

/// Direction of the container ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(Error::InvalidValue {
                key: "sort_order",
                value: s.to_owned(),
                reason: "expected asc or desc",
            }),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        })
    }
}

/// Values given on the command line; they beat every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub webhook_url: Option<String>,
    pub refresh_interval: Option<u64>,
}

/// Immutable settings for one run of the agent.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub docker_host: String,
    pub api_version: String,
    pub show_stopped: bool,
    pub thresholds: Thresholds,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
    pub webhook_url: String,
    pub refresh_interval: Duration,
}

impl Config {
    /// Loads the configuration from the optional config file, the process
    /// environment and `overrides`.
    ///
    /// # Errors
    ///
    /// Fails if the config file is unreadable or malformed, if an
    /// environment variable holds an invalid value, or if no webhook URL
    /// can be resolved from any source.
    pub fn load(config_file: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let file = match config_file {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::resolve(file, |var| std::env::var(var).ok(), overrides)
    }

    /// Layers `env` and `overrides` on top of `file` and fills in defaults.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn resolve(
        mut file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
        overrides: Overrides,
    ) -> Result<Self> {
        file.apply_env(env)?;

        let webhook_url = overrides
            .webhook_url
            .or(file.webhook_url)
            .map(|url| url.trim().to_owned())
            .filter(|url| !url.is_empty())
            .ok_or(Error::MissingWebhookUrl)?;

        let refresh_interval = overrides
            .refresh_interval
            .or(file.refresh_interval)
            .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS);
        if refresh_interval == 0 {
            return Err(Error::InvalidValue {
                key: "refresh_interval",
                value: refresh_interval.to_string(),
                reason: "must be at least one second",
            });
        }

        let defaults = Thresholds::default();
        Ok(Self {
            docker_host: file
                .docker_host
                .unwrap_or_else(|| DEFAULT_DOCKER_HOST.to_owned()),
            api_version: file
                .docker_api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_owned()),
            show_stopped: file.show_stopped.unwrap_or(false),
            thresholds: Thresholds {
                cpu: file.cpu_threshold.unwrap_or(defaults.cpu),
                memory: file.memory_threshold.unwrap_or(defaults.memory),
            },
            sort_by: file.sort_by.unwrap_or_default(),
            sort_order: file.sort_order.unwrap_or_default(),
            webhook_url,
            refresh_interval: Duration::from_secs(refresh_interval),
        })
    }
}
