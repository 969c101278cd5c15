pub mod health;
pub mod runs;
pub mod webhook;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /runs                   submit, list (auth required)
/// /runs/{run_id}          status of one run (auth required)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/runs", runs::router())
}

/// Routes mounted at `/api`, outside the versioned tree.
///
/// The provider is configured with a fixed callback path, and older
/// clients poll `/api/status/{run_id}`.
///
/// ```text
/// /webhook                provider completion callback (public)
/// /status/{run_id}        run status (auth required)
/// ```
pub fn callback_routes() -> Router<AppState> {
    Router::new()
        .merge(webhook::router())
        .route("/status/{run_id}", get(handlers::runs::get_run))
}
