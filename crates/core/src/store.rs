//! Persistence seam for [`Run`] records.
//!
//! The submitter writes through [`RunStore::create`]; the webhook receiver and
//! status endpoints go through [`RunStore::mark_complete`] and
//! [`RunStore::get`]. Both completion channels race on the same record, so
//! `mark_complete` must be a single set-if-absent: the first image URL wins
//! and every later write is a no-op.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::run::{Run, RunInputs};
use crate::types::{DbId, RunId};

/// Errors raised by a [`RunStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum RunStoreError {
    /// A run with this id already exists. The existing record is untouched.
    #[error("Run {0} already exists")]
    DuplicateJob(RunId),

    /// The storage backend failed (connection, query, decode).
    #[error("Run store backend error: {0}")]
    Backend(String),
}

/// Result of a [`RunStore::mark_complete`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// This call performed the pending -> complete transition.
    Completed,
    /// The run already had an image URL; nothing changed.
    AlreadyComplete,
    /// No run with this id exists; nothing changed.
    UnknownRun,
}

#[async_trait]
pub trait RunStore: Send + Sync {
    /// Persist a newly accepted run.
    async fn create(
        &self,
        run_id: &str,
        user_id: DbId,
        inputs: &RunInputs,
    ) -> Result<Run, RunStoreError>;

    /// Record the result image. First writer wins.
    async fn mark_complete(&self, run_id: &str, image_url: &str)
        -> Result<Completion, RunStoreError>;

    async fn get(&self, run_id: &str) -> Result<Option<Run>, RunStoreError>;

    /// Runs owned by `user_id`, newest first.
    async fn list_by_user(
        &self,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Run>, RunStoreError>;

    async fn health_check(&self) -> Result<(), RunStoreError>;
}

/// Process-local [`RunStore`] used by tests and `RUN_STORE=memory` dev runs.
#[derive(Default)]
pub struct MemoryRunStore {
    runs: RwLock<HashMap<RunId, Run>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn create(
        &self,
        run_id: &str,
        user_id: DbId,
        inputs: &RunInputs,
    ) -> Result<Run, RunStoreError> {
        let mut runs = self.runs.write().await;
        if runs.contains_key(run_id) {
            return Err(RunStoreError::DuplicateJob(run_id.to_string()));
        }
        let run = Run::new(run_id, user_id, inputs.clone());
        runs.insert(run.run_id.clone(), run.clone());
        Ok(run)
    }

    async fn mark_complete(
        &self,
        run_id: &str,
        image_url: &str,
    ) -> Result<Completion, RunStoreError> {
        let mut runs = self.runs.write().await;
        let Some(run) = runs.get_mut(run_id) else {
            return Ok(Completion::UnknownRun);
        };
        if run.image_url.is_some() {
            return Ok(Completion::AlreadyComplete);
        }
        run.image_url = Some(image_url.to_string());
        run.completed_at = Some(chrono::Utc::now());
        Ok(Completion::Completed)
    }

    async fn get(&self, run_id: &str) -> Result<Option<Run>, RunStoreError> {
        Ok(self.runs.read().await.get(run_id).cloned())
    }

    async fn list_by_user(
        &self,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Run>, RunStoreError> {
        let mut owned: Vec<Run> = self
            .runs
            .read()
            .await
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn health_check(&self) -> Result<(), RunStoreError> {
        Ok(())
    }
}
