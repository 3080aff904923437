//! Delivery of payloads to the dashboard webhook.
use std::time::Duration;

use serde::Serialize;

use crate::error::ResultOkLogExt;
use crate::snapshot::Envelope;

/// Upper bound for a single delivery, connect and response included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("webhook responded with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Sink for published payloads.
pub trait Publish {
    /// Delivers `payload` wrapped in the `merge_variables` envelope.
    ///
    /// Returns whether the receiver accepted it. Failures are logged by the
    /// implementation and never retried.
    fn publish<T: Serialize + Sync>(
        &self,
        payload: &T,
    ) -> impl std::future::Future<Output = bool> + Send;
}

/// [`Publish`] over HTTP POST.
#[derive(Debug, Clone)]
pub struct WebhookPublisher {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl WebhookPublisher {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post<T: Serialize + Sync>(&self, payload: &T) -> Result<(), PublishError> {
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&Envelope::new(payload))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(PublishError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Status { status, body });
        }

        log::debug!("webhook accepted payload: status={status}");
        Ok(())
    }
}

impl Publish for WebhookPublisher {
    async fn publish<T: Serialize + Sync>(&self, payload: &T) -> bool {
        self.post(payload)
            .await
            .ok_log("failed to push to webhook")
            .is_some()
    }
}
