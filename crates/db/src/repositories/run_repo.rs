//! Repository for the `runs` table.
//!
//! `image_url` is written once: [`RunRepo::set_image_url_if_absent`] only
//! touches rows where it is still `NULL`, so the webhook and the poller path
//! can race without coordinating.

use dreamrun_core::run::RunInputs;
use dreamrun_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::run::RunRow;

/// Column list for `runs` queries.
const COLUMNS: &str = "\
    id, run_id, user_id, inputs, image_url, \
    created_at, completed_at, updated_at";

/// Provides the write/read operations on accepted runs.
pub struct RunRepo;

impl RunRepo {
    /// Insert a run unless one with the same `run_id` exists.
    ///
    /// Returns `None` on conflict; the existing row is left as-is.
    pub async fn insert(
        pool: &PgPool,
        run_id: &str,
        user_id: DbId,
        inputs: &RunInputs,
    ) -> Result<Option<RunRow>, sqlx::Error> {
        let query = format!(
            "INSERT INTO runs (run_id, user_id, inputs) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (run_id) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RunRow>(&query)
            .bind(run_id)
            .bind(user_id)
            .bind(Json(inputs))
            .fetch_optional(pool)
            .await
    }

    /// Set `image_url` and `completed_at` if the run has no image yet.
    ///
    /// Returns `true` if this call performed the transition.
    pub async fn set_image_url_if_absent(
        pool: &PgPool,
        run_id: &str,
        image_url: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE runs \
             SET image_url = $2, completed_at = NOW(), updated_at = NOW() \
             WHERE run_id = $1 AND image_url IS NULL",
        )
        .bind(run_id)
        .bind(image_url)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether a run with this id exists.
    pub async fn exists(pool: &PgPool, run_id: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM runs WHERE run_id = $1)")
            .bind(run_id)
            .fetch_one(pool)
            .await
    }

    /// Find a run by its provider id.
    pub async fn find_by_run_id(
        pool: &PgPool,
        run_id: &str,
    ) -> Result<Option<RunRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM runs WHERE run_id = $1");
        sqlx::query_as::<_, RunRow>(&query)
            .bind(run_id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's runs, newest first.
    pub async fn list_by_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<RunRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM runs \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, RunRow>(&query)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
