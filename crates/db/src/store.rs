//! [`RunStore`] backed by PostgreSQL.

use async_trait::async_trait;
use dreamrun_core::run::{Run, RunInputs};
use dreamrun_core::store::{Completion, RunStore, RunStoreError};
use dreamrun_core::types::DbId;

use crate::repositories::RunRepo;
use crate::DbPool;

/// Production run store. Cheap to clone (the pool is reference counted).
#[derive(Clone)]
pub struct PgRunStore {
    pool: DbPool,
}

impl PgRunStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

fn backend(err: sqlx::Error) -> RunStoreError {
    tracing::error!(error = %err, "Run store query failed");
    RunStoreError::Backend(err.to_string())
}

#[async_trait]
impl RunStore for PgRunStore {
    async fn create(
        &self,
        run_id: &str,
        user_id: DbId,
        inputs: &RunInputs,
    ) -> Result<Run, RunStoreError> {
        RunRepo::insert(&self.pool, run_id, user_id, inputs)
            .await
            .map_err(backend)?
            .map(Run::from)
            .ok_or_else(|| RunStoreError::DuplicateJob(run_id.to_string()))
    }

    async fn mark_complete(
        &self,
        run_id: &str,
        image_url: &str,
    ) -> Result<Completion, RunStoreError> {
        if RunRepo::set_image_url_if_absent(&self.pool, run_id, image_url)
            .await
            .map_err(backend)?
        {
            return Ok(Completion::Completed);
        }

        // Nothing updated: either already complete or never created.
        let exists = RunRepo::exists(&self.pool, run_id).await.map_err(backend)?;
        Ok(if exists {
            Completion::AlreadyComplete
        } else {
            Completion::UnknownRun
        })
    }

    async fn get(&self, run_id: &str) -> Result<Option<Run>, RunStoreError> {
        Ok(RunRepo::find_by_run_id(&self.pool, run_id)
            .await
            .map_err(backend)?
            .map(Run::from))
    }

    async fn list_by_user(
        &self,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Run>, RunStoreError> {
        Ok(RunRepo::list_by_user(&self.pool, user_id, limit, offset)
            .await
            .map_err(backend)?
            .into_iter()
            .map(Run::from)
            .collect())
    }

    async fn health_check(&self) -> Result<(), RunStoreError> {
        crate::health_check(&self.pool).await.map_err(backend)
    }
}
