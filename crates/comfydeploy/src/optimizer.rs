//! Prompt optimizer client.
//!
//! Sends the user's prompt to an external text-transform service and uses
//! `choices[0].content` from its reply. Any failure degrades to the original
//! prompt: this step can never fail a submission.

use serde::Deserialize;

use crate::config::OptimizerConfig;

#[derive(Debug, Deserialize)]
struct OptimizerResponse {
    choices: Vec<OptimizerChoice>,
}

#[derive(Debug, Deserialize)]
struct OptimizerChoice {
    content: Option<String>,
}

/// Single-attempt client for the prompt-optimization service.
pub struct PromptOptimizer {
    client: reqwest::Client,
    url: Option<String>,
}

impl PromptOptimizer {
    pub fn new(config: &OptimizerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default optimizer HTTP client");
                reqwest::Client::new()
            });
        Self {
            client,
            url: config.url.clone(),
        }
    }

    /// An optimizer that never calls out and returns prompts unchanged.
    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            url: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    /// Optimize `prompt`, returning it unchanged on any failure.
    pub async fn optimize(&self, prompt: &str) -> String {
        let Some(url) = self.url.as_deref() else {
            return prompt.to_string();
        };

        tracing::debug!("Optimizing prompt");
        match self.try_optimize(url, prompt).await {
            Ok(Some(optimized)) => {
                tracing::info!(
                    original_len = prompt.len(),
                    optimized_len = optimized.len(),
                    "Prompt optimized",
                );
                optimized
            }
            Ok(None) => {
                tracing::warn!("Optimizer response has no content, using original prompt");
                prompt.to_string()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Prompt optimization failed, using original prompt");
                prompt.to_string()
            }
        }
    }

    async fn try_optimize(&self, url: &str, prompt: &str) -> Result<Option<String>, reqwest::Error> {
        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await?
            .error_for_status()?;

        let body: OptimizerResponse = response.json().await?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()))
    }
}
