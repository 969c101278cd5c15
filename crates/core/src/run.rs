//! The [`Run`] record: one accepted image-generation job.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, RunId, Timestamp};

/// Exact parameter set sent to the provider.
///
/// ComfyDeploy workflow inputs are string-typed, so the numeric fields are
/// carried as strings on the wire and in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInputs {
    pub input_text: String,
    pub batch: String,
    pub width: String,
    pub height: String,
    pub id: String,
}

/// Lifecycle of a run, derived from the presence of its image URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Complete,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Complete => "complete",
        }
    }
}

/// A durable record of a job the provider accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub run_id: RunId,
    pub user_id: DbId,
    pub inputs: RunInputs,
    pub image_url: Option<String>,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl Run {
    /// A freshly accepted run with no result yet.
    pub fn new(run_id: impl Into<RunId>, user_id: DbId, inputs: RunInputs) -> Self {
        Self {
            run_id: run_id.into(),
            user_id,
            inputs,
            image_url: None,
            created_at: chrono::Utc::now(),
            completed_at: None,
        }
    }

    pub fn status(&self) -> RunStatus {
        if self.image_url.is_some() {
            RunStatus::Complete
        } else {
            RunStatus::Pending
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status() == RunStatus::Complete
    }
}

/// Client-facing projection of a [`Run`] returned by the status endpoints.
///
/// The prompt inputs stay server-side; pollers only need the state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunView {
    pub run_id: RunId,
    pub status: RunStatus,
    pub image_url: Option<String>,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

impl From<Run> for RunView {
    fn from(run: Run) -> Self {
        Self {
            status: run.status(),
            run_id: run.run_id,
            image_url: run.image_url,
            created_at: run.created_at,
            completed_at: run.completed_at,
        }
    }
}
