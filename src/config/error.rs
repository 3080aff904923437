use std::path::PathBuf;

/// Errors that prevent the agent from starting.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "webhook URL required: provide it via --webhook-url, the config file, or the TRMNL_WEBHOOK_URL environment variable"
    )]
    MissingWebhookUrl,
    #[error("failed to read config file `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value `{value}` in environment variable `{var}`")]
    InvalidEnv { var: &'static str, value: String },
    #[error("invalid value `{value}` for `{key}`: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
