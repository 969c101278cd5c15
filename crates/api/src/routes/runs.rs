//! Route definitions for the `/runs` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::runs;
use crate::state::AppState;

/// Routes mounted at `/runs`.
///
/// ```text
/// GET    /                -> list_runs
/// POST   /                -> submit_run
/// GET    /{run_id}        -> get_run
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(runs::list_runs).post(runs::submit_run))
        .route("/{run_id}", get(runs::get_run))
}
