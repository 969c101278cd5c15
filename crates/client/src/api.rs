//! Thin HTTP client for the Dreamrun API.

use dreamrun_core::run::RunView;
use dreamrun_core::types::RunId;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Error code the server uses when the provider timed out on every attempt.
pub const PROVIDER_TIMEOUT_CODE: &str = "PROVIDER_TIMEOUT";

/// Errors from a single API call.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response.
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider kept timing out; the run was not queued.
    #[error("Image provider timed out: {message}")]
    ProviderTimeout { message: String },

    /// The server answered with an error body.
    #[error("API error {status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// A success response whose body did not match the expected shape.
    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl ClientError {
    /// Failures the caller may swallow after logging.
    ///
    /// A provider timeout is expected under load and is worth a retry by
    /// the user, not an error report.
    pub fn is_suppressible(&self) -> bool {
        matches!(self, ClientError::ProviderTimeout { .. })
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    code: String,
}

#[derive(Deserialize)]
struct SubmittedRun {
    run_id: RunId,
}

/// Authenticated client bound to one API base URL.
#[derive(Clone)]
pub struct DreamrunClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl DreamrunClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, token)
    }

    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Submit a prompt. Returns the provider run id.
    pub async fn submit(&self, prompt: &str) -> Result<RunId, ClientError> {
        let response = self
            .http
            .post(format!("{}/api/v1/runs", self.base_url))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await?;

        let submitted: SubmittedRun = Self::read_data(response).await?;
        Ok(submitted.run_id)
    }

    /// Current state of a run.
    pub async fn status(&self, run_id: &str) -> Result<RunView, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/status/{run_id}", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;

        Self::read_data(response).await
    }

    async fn read_data<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(classify_error(status, &text));
        }

        serde_json::from_str::<Envelope<T>>(&text)
            .map(|envelope| envelope.data)
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

fn classify_error(status: StatusCode, text: &str) -> ClientError {
    let (code, message) = match serde_json::from_str::<ErrorBody>(text) {
        Ok(body) => (body.code, body.error),
        Err(_) => (String::new(), text.to_string()),
    };

    if status == StatusCode::GATEWAY_TIMEOUT && code == PROVIDER_TIMEOUT_CODE {
        return ClientError::ProviderTimeout { message };
    }

    ClientError::Api {
        status: status.as_u16(),
        code,
        message,
    }
}
