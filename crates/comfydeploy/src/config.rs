//! Provider and optimizer configuration.

use std::time::Duration;

/// Default ComfyDeploy run endpoint.
pub const DEFAULT_API_URL: &str = "https://www.comfydeploy.com/api/run";

/// Default per-attempt wall-clock bound.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default total number of submission attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default fixed wait between retryable attempts.
pub const DEFAULT_BACKOFF_MS: u64 = 5_000;

/// Default optimizer request timeout.
pub const DEFAULT_OPTIMIZER_TIMEOUT_SECS: u64 = 15;

/// Credentials and retry tuning for the job submitter.
#[derive(Debug, Clone)]
pub struct ComfyDeployConfig {
    /// Run endpoint, used for both submission (POST) and status (GET).
    pub api_url: String,
    /// Bearer token for the provider API.
    pub api_key: String,
    /// Workflow deployment that renders the image.
    pub deployment_id: String,
    /// Hard bound on each submission attempt.
    pub timeout: Duration,
    /// Total attempts, including the first.
    pub max_retries: u32,
    /// Fixed wait between retryable attempts. Does not grow.
    pub backoff: Duration,
}

impl ComfyDeployConfig {
    /// Build a config with default endpoint and retry tuning.
    pub fn new(api_key: impl Into<String>, deployment_id: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
            deployment_id: deployment_id.into(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                          | Required | Default                                |
    /// |----------------------------------|----------|----------------------------------------|
    /// | `COMFY_DEPLOY_API_KEY`           | **yes**  | --                                     |
    /// | `COMFY_DEPLOY_WF_DEPLOYMENT_ID`  | **yes**  | --                                     |
    /// | `COMFY_DEPLOY_API_URL`           | no       | `https://www.comfydeploy.com/api/run`  |
    /// | `COMFY_DEPLOY_TIMEOUT_MS`        | no       | `30000`                                |
    /// | `COMFY_DEPLOY_MAX_RETRIES`       | no       | `3`                                    |
    /// | `COMFY_DEPLOY_BACKOFF_MS`        | no       | `5000`                                 |
    ///
    /// # Panics
    ///
    /// Panics if a required variable is missing or a numeric one does not parse.
    pub fn from_env() -> Self {
        let api_key = std::env::var("COMFY_DEPLOY_API_KEY")
            .expect("COMFY_DEPLOY_API_KEY must be set in the environment");
        let deployment_id = std::env::var("COMFY_DEPLOY_WF_DEPLOYMENT_ID")
            .expect("COMFY_DEPLOY_WF_DEPLOYMENT_ID must be set in the environment");

        let api_url =
            std::env::var("COMFY_DEPLOY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());

        let timeout_ms: u64 = std::env::var("COMFY_DEPLOY_TIMEOUT_MS")
            .unwrap_or_else(|_| DEFAULT_TIMEOUT_MS.to_string())
            .parse()
            .expect("COMFY_DEPLOY_TIMEOUT_MS must be a valid u64");

        let max_retries: u32 = std::env::var("COMFY_DEPLOY_MAX_RETRIES")
            .unwrap_or_else(|_| DEFAULT_MAX_RETRIES.to_string())
            .parse()
            .expect("COMFY_DEPLOY_MAX_RETRIES must be a valid u32");
        assert!(max_retries > 0, "COMFY_DEPLOY_MAX_RETRIES must be at least 1");

        let backoff_ms: u64 = std::env::var("COMFY_DEPLOY_BACKOFF_MS")
            .unwrap_or_else(|_| DEFAULT_BACKOFF_MS.to_string())
            .parse()
            .expect("COMFY_DEPLOY_BACKOFF_MS must be a valid u64");

        Self {
            api_url,
            api_key,
            deployment_id,
            timeout: Duration::from_millis(timeout_ms),
            max_retries,
            backoff: Duration::from_millis(backoff_ms),
        }
    }

    /// Upper bound on how long one `submit` can spend talking to the provider.
    pub fn worst_case(&self) -> Duration {
        let attempts = self.max_retries.max(1);
        self.timeout * attempts + self.backoff * (attempts - 1)
    }
}

/// Configuration for the external prompt optimizer.
#[derive(Debug, Clone, Default)]
pub struct OptimizerConfig {
    /// Endpoint URL. `None` disables optimization (identity transform).
    pub url: Option<String>,
    /// Request timeout for the single attempt.
    pub timeout: Duration,
}

impl OptimizerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            timeout: Duration::from_secs(DEFAULT_OPTIMIZER_TIMEOUT_SECS),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                          | Required | Default |
    /// |----------------------------------|----------|---------|
    /// | `PROMPT_OPTIMIZER_URL`           | no       | unset   |
    /// | `PROMPT_OPTIMIZER_TIMEOUT_SECS`  | no       | `15`    |
    pub fn from_env() -> Self {
        let url = std::env::var("PROMPT_OPTIMIZER_URL")
            .ok()
            .filter(|u| !u.trim().is_empty());

        let timeout_secs: u64 = std::env::var("PROMPT_OPTIMIZER_TIMEOUT_SECS")
            .unwrap_or_else(|_| DEFAULT_OPTIMIZER_TIMEOUT_SECS.to_string())
            .parse()
            .expect("PROMPT_OPTIMIZER_TIMEOUT_SECS must be a valid u64");

        Self {
            url,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}
