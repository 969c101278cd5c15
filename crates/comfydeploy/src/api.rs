//! REST API client for the ComfyDeploy run endpoint.
//!
//! Wraps a single HTTP exchange per call using [`reqwest`]. Retry, timeout
//! and persistence live in [`JobSubmitter`](crate::submitter::JobSubmitter);
//! this layer only classifies what the provider said.

use dreamrun_core::run::RunInputs;
use reqwest::StatusCode;
use serde::Serialize;

use crate::callback::RunUpdate;
use crate::config::ComfyDeployConfig;

/// HTTP client for the ComfyDeploy run API.
pub struct ComfyDeployApi {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    deployment_id: String,
}

/// Body of `POST /api/run`.
#[derive(Debug, Serialize)]
pub struct QueueRunRequest<'a> {
    pub deployment_id: &'a str,
    pub inputs: &'a RunInputs,
    /// Where the provider pushes completion callbacks.
    pub webhook: &'a str,
}

/// Errors from a single ComfyDeploy API call.
#[derive(Debug, thiserror::Error)]
pub enum ComfyDeployApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider's gateway gave up (HTTP 504). Transient under load.
    #[error("ComfyDeploy gateway timeout (504)")]
    GatewayTimeout,

    /// ComfyDeploy returned any other non-2xx status code.
    #[error("ComfyDeploy API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx response whose body is not the JSON we expect.
    #[error("Malformed ComfyDeploy response: {0}")]
    MalformedBody(String),

    /// A 2xx response without a `run_id`.
    #[error("ComfyDeploy response has no run_id: {body}")]
    MissingRunId {
        /// Raw response body for debugging.
        body: String,
    },
}

impl ComfyDeployApiError {
    /// Whether the failure is transient and another attempt may succeed.
    ///
    /// Gateway timeouts and transport-level connect/timeout failures are
    /// retryable; everything the provider answered explicitly is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ComfyDeployApiError::GatewayTimeout => true,
            ComfyDeployApiError::Request(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

impl ComfyDeployApi {
    /// Create a new API client from provider configuration.
    pub fn new(config: &ComfyDeployConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling).
    pub fn with_client(client: reqwest::Client, config: &ComfyDeployConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            deployment_id: config.deployment_id.clone(),
        }
    }

    /// Queue a run for the configured deployment.
    ///
    /// Sends a `POST` to the run endpoint and returns the provider-assigned
    /// `run_id`. Does not retry.
    pub async fn queue_run(
        &self,
        inputs: &RunInputs,
        webhook_url: &str,
    ) -> Result<String, ComfyDeployApiError> {
        let body = QueueRunRequest {
            deployment_id: &self.deployment_id,
            inputs,
            webhook: webhook_url,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let text = Self::ensure_success(response).await?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| ComfyDeployApiError::MalformedBody(e.to_string()))?;

        value
            .get("run_id")
            .and_then(|v| v.as_str())
            .filter(|id| !id.trim().is_empty())
            .map(str::to_string)
            .ok_or(ComfyDeployApiError::MissingRunId { body: text })
    }

    /// Fetch the provider's current view of a run.
    ///
    /// Sends a `GET` to the run endpoint with a `run_id` query parameter.
    pub async fn get_run(&self, run_id: &str) -> Result<RunUpdate, ComfyDeployApiError> {
        let response = self
            .client
            .get(&self.api_url)
            .bearer_auth(&self.api_key)
            .query(&[("run_id", run_id)])
            .send()
            .await?;

        let text = Self::ensure_success(response).await?;
        serde_json::from_str(&text).map_err(|e| ComfyDeployApiError::MalformedBody(e.to_string()))
    }

    // ---- private helpers ----

    /// Classify the status code and return the body text on success.
    async fn ensure_success(response: reqwest::Response) -> Result<String, ComfyDeployApiError> {
        let status = response.status();
        if status == StatusCode::GATEWAY_TIMEOUT {
            return Err(ComfyDeployApiError::GatewayTimeout);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ComfyDeployApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.text().await?)
    }
}
