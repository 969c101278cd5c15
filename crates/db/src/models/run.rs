//! Row model for the `runs` table.

use dreamrun_core::run::{Run, RunInputs};
use dreamrun_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `runs` table.
#[derive(Debug, Clone, FromRow)]
pub struct RunRow {
    pub id: DbId,
    pub run_id: String,
    pub user_id: DbId,
    pub inputs: Json<RunInputs>,
    pub image_url: Option<String>,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl From<RunRow> for Run {
    fn from(row: RunRow) -> Self {
        Run {
            run_id: row.run_id,
            user_id: row.user_id,
            inputs: row.inputs.0,
            image_url: row.image_url,
            created_at: row.created_at,
            completed_at: row.completed_at,
        }
    }
}
