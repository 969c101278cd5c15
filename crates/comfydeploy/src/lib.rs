//! ComfyDeploy client library.
//!
//! Provides the prompt optimizer, the REST wrapper for the run endpoint,
//! the typed callback/status payloads, and the [`JobSubmitter`] that ties
//! them together with the timeout and retry policy.

pub mod api;
pub mod callback;
pub mod config;
pub mod optimizer;
pub mod submitter;

pub use api::{ComfyDeployApi, ComfyDeployApiError};
pub use config::{ComfyDeployConfig, OptimizerConfig};
pub use optimizer::PromptOptimizer;
pub use submitter::{JobSubmitter, SubmissionError};
