use std::path::Path;

use serde::Deserialize;

use super::{Error, Result, SortKey, SortOrder};

/// Settings as they appear in the JSON config file.
///
/// Every key is optional and unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub webhook_url: Option<String>,
    pub docker_host: Option<String>,
    pub docker_api_version: Option<String>,
    pub show_stopped: Option<bool>,
    pub cpu_threshold: Option<u32>,
    pub memory_threshold: Option<u32>,
    pub sort_by: Option<SortKey>,
    pub sort_order: Option<SortOrder>,
    pub refresh_interval: Option<u64>,
}

impl FileConfig {
    /// Reads the config file at `path`.
    ///
    /// A file that does not exist yields the empty configuration, so the
    /// same service definition works with or without a config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Read`] if the file exists but cannot be read and
    /// [`Error::Parse`] if it is not valid JSON of the expected shape.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Config file `{}` not found, ignoring it", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(Error::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&contents).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overrides fields with the environment variables that are set.
    ///
    /// `env` looks up a variable by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEnv`] if a numeric or enumerated variable
    /// cannot be parsed.
    pub fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = env("TRMNL_WEBHOOK_URL") {
            self.webhook_url = Some(url);
        }
        if let Some(host) = env("DOCKER_HOST") {
            self.docker_host = Some(host);
        }
        if let Some(version) = env("DOCKER_API_VERSION") {
            self.docker_api_version = Some(version);
        }
        if let Some(value) = env("SHOW_STOPPED") {
            self.show_stopped = Some(parse_bool(&value));
        }
        if let Some(value) = env("CPU_THRESHOLD") {
            self.cpu_threshold = Some(parse_env("CPU_THRESHOLD", value)?);
        }
        if let Some(value) = env("MEMORY_THRESHOLD") {
            self.memory_threshold = Some(parse_env("MEMORY_THRESHOLD", value)?);
        }
        if let Some(value) = env("SORT_BY") {
            self.sort_by = Some(parse_env("SORT_BY", value)?);
        }
        if let Some(value) = env("SORT_ORDER") {
            self.sort_order = Some(parse_env("SORT_ORDER", value)?);
        }

        Ok(())
    }
}

/// `true`, `1` and `yes` (any case) are true, everything else is false.
fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidEnv { var, value })
}
