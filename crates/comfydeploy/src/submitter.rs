//! Job submission with per-attempt timeout and fixed-backoff retry.
//!
//! [`JobSubmitter::submit`] optimizes the prompt, builds the fixed input
//! record, and queues the run. Attempts run strictly one after another.
//! Each is wrapped in [`tokio::time::timeout`], so an expired attempt drops
//! the in-flight request. A 504 or a timeout waits `backoff` and tries
//! again until `max_retries` attempts are spent; anything else the provider
//! answers ends the loop. A run is persisted only once the provider has
//! returned its id.

use std::sync::Arc;

use dreamrun_core::generation::{build_inputs, validate_prompt};
use dreamrun_core::run::RunInputs;
use dreamrun_core::store::{RunStore, RunStoreError};
use dreamrun_core::types::{DbId, RunId};

use crate::api::ComfyDeployApi;
use crate::config::ComfyDeployConfig;
use crate::optimizer::PromptOptimizer;

/// Why a submission did not produce a run.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// No authenticated principal was supplied.
    #[error("User not authenticated")]
    Unauthenticated,

    /// The prompt failed validation; nothing was sent.
    #[error("Invalid prompt: {0}")]
    InvalidPrompt(String),

    /// Every attempt hit a gateway timeout or the local timeout.
    #[error("Provider still timing out after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// The provider answered with something other than an accepted run.
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// The run was accepted but could not be recorded.
    #[error(transparent)]
    Store(#[from] RunStoreError),
}

impl SubmissionError {
    /// Low-severity failures callers may log instead of alerting on.
    pub fn is_suppressible(&self) -> bool {
        matches!(self, SubmissionError::RetriesExhausted { .. })
    }
}

/// Outcome of one submission attempt.
enum Attempt {
    Accepted(RunId),
    Retryable(String),
    Fatal(String),
}

/// Submits generation jobs and records the accepted ones.
pub struct JobSubmitter {
    api: ComfyDeployApi,
    optimizer: PromptOptimizer,
    store: Arc<dyn RunStore>,
    config: ComfyDeployConfig,
}

impl JobSubmitter {
    pub fn new(
        config: ComfyDeployConfig,
        optimizer: PromptOptimizer,
        store: Arc<dyn RunStore>,
    ) -> Self {
        Self {
            api: ComfyDeployApi::new(&config),
            optimizer,
            store,
            config,
        }
    }

    pub fn config(&self) -> &ComfyDeployConfig {
        &self.config
    }

    pub fn api(&self) -> &ComfyDeployApi {
        &self.api
    }

    /// Submit `prompt` on behalf of `user_id`.
    ///
    /// `webhook_url` is handed to the provider as the completion callback.
    /// Returns the provider-assigned run id once the run is persisted.
    pub async fn submit(
        &self,
        prompt: &str,
        user_id: Option<DbId>,
        webhook_url: &str,
    ) -> Result<RunId, SubmissionError> {
        let user_id = user_id.ok_or_else(|| {
            tracing::warn!("Rejecting submission without an authenticated user");
            SubmissionError::Unauthenticated
        })?;
        validate_prompt(prompt).map_err(|e| SubmissionError::InvalidPrompt(e.to_string()))?;

        tracing::info!(user_id, "Starting image generation");

        let effective_prompt = self.optimizer.optimize(prompt).await;
        let inputs = build_inputs(&effective_prompt);

        let attempts = self.config.max_retries.max(1);
        for attempt in 1..=attempts {
            match self.attempt(&inputs, webhook_url).await {
                Attempt::Accepted(run_id) => {
                    self.store.create(&run_id, user_id, &inputs).await?;
                    tracing::info!(run_id = %run_id, user_id, attempt, "Run queued");
                    return Ok(run_id);
                }
                Attempt::Fatal(reason) => {
                    tracing::error!(user_id, attempt, error = %reason, "Run submission rejected");
                    return Err(SubmissionError::InvalidResponse(reason));
                }
                Attempt::Retryable(reason) => {
                    tracing::warn!(user_id, attempt, error = %reason, "Run submission attempt failed");
                    if attempt < attempts {
                        tracing::debug!(
                            backoff_ms = self.config.backoff.as_millis() as u64,
                            "Waiting before next attempt",
                        );
                        tokio::time::sleep(self.config.backoff).await;
                    }
                }
            }
        }

        tracing::warn!(user_id, attempts, "Run submission retries exhausted");
        Err(SubmissionError::RetriesExhausted { attempts })
    }

    /// Run one bounded attempt and classify the result.
    async fn attempt(&self, inputs: &RunInputs, webhook_url: &str) -> Attempt {
        match tokio::time::timeout(self.config.timeout, self.api.queue_run(inputs, webhook_url))
            .await
        {
            Err(_) => Attempt::Retryable(format!(
                "attempt timed out after {} ms",
                self.config.timeout.as_millis()
            )),
            Ok(Ok(run_id)) => Attempt::Accepted(run_id),
            Ok(Err(e)) if e.is_retryable() => Attempt::Retryable(e.to_string()),
            Ok(Err(e)) => Attempt::Fatal(e.to_string()),
        }
    }
}
