/// Errors that affect the engine as a whole.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid docker api version `{0}`, expected `<major>.<minor>`")]
    InvalidApiVersion(String),
    #[error("failed to connect to docker engine at `{host}`: {source}")]
    Connect {
        host: String,
        #[source]
        source: bollard::errors::Error,
    },
    #[error("docker engine request `{operation}` failed: {source}")]
    Request {
        operation: &'static str,
        #[source]
        source: bollard::errors::Error,
    },
    #[error("malformed engine response for `{operation}`: {reason}")]
    MalformedResponse {
        operation: &'static str,
        reason: String,
    },
}

impl Error {
    /// Whether the engine itself could not be reached or queried.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Error::Connect { .. } | Error::Request { .. })
    }

    /// Whether the engine answered with 404 for the queried object.
    pub(super) fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::Request {
                source: bollard::errors::Error::DockerResponseServerError {
                    status_code: 404,
                    ..
                },
                ..
            }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Errors reading the usage counters of a single container.
#[derive(Debug, thiserror::Error)]
pub enum SamplingError {
    #[error("stats request for container `{container}` failed: {source}")]
    Request {
        container: String,
        #[source]
        source: bollard::errors::Error,
    },
    #[error("stats stream for container `{container}` ended without a reading")]
    StreamEnded { container: String },
    #[error("stats for container `{container}` are missing `{field}`")]
    MissingField {
        container: String,
        field: &'static str,
    },
    #[error("container `{container}` is not known to the engine")]
    NotFound { container: String },
    #[error("no engine to sample container `{container}` from: {source}")]
    Unavailable {
        container: String,
        #[source]
        source: Error,
    },
}
