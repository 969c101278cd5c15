//! Handlers for submitting runs and reading their status.
//!
//! Reads require authentication via [`AuthUser`] and only ever expose the
//! caller's own runs. Submission takes an optional principal so the
//! submitter itself rejects anonymous callers.

use axum::extract::{Path, Query, State};
use axum::http::header::HOST;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use dreamrun_core::error::CoreError;
use dreamrun_core::run::{Run, RunView};
use serde::{Deserialize, Serialize};

use crate::completion::refresh_from_provider;
use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Path of the provider callback, relative to the public base URL.
pub const WEBHOOK_PATH: &str = "/api/webhook";

/// Body of `POST /api/v1/runs`.
#[derive(Debug, Deserialize)]
pub struct SubmitRun {
    pub prompt: String,
}

/// Returned once the provider has accepted the run.
#[derive(Debug, Serialize)]
pub struct SubmittedRun {
    pub run_id: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build the callback URL handed to the provider.
///
/// Prefers the configured public URL; otherwise trusts the `Host` header
/// and assumes HTTPS.
pub fn webhook_url(config: &ServerConfig, headers: &HeaderMap) -> AppResult<String> {
    if let Some(base) = &config.public_url {
        return Ok(format!("{base}{WEBHOOK_PATH}"));
    }
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing Host header".into()))?;
    Ok(format!("https://{host}{WEBHOOK_PATH}"))
}

/// Fetch a run and verify the caller owns it.
///
/// Another user's run is reported as not found so ids cannot be probed.
async fn find_owned(state: &AppState, run_id: &str, auth: &AuthUser) -> AppResult<Run> {
    state
        .store
        .get(run_id)
        .await?
        .filter(|run| run.user_id == auth.user_id)
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Run",
                id: run_id.to_string(),
            })
        })
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/runs
///
/// Optimize the prompt, queue the run with the provider, and record it.
/// Returns 201 with the provider's run id. Provider retry exhaustion comes
/// back as 504 `PROVIDER_TIMEOUT`.
pub async fn submit_run(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<SubmitRun>,
) -> AppResult<impl IntoResponse> {
    let webhook_url = webhook_url(&state.config, &headers)?;

    let run_id = state
        .submitter
        .submit(&input.prompt, auth.map(|a| a.user_id), &webhook_url)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SubmittedRun { run_id },
        }),
    ))
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /api/v1/runs
///
/// List the caller's runs, newest first. Supports `limit` and `offset`.
pub async fn list_runs(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let runs: Vec<RunView> = state
        .store
        .list_by_user(auth.user_id, params.limit(), params.offset())
        .await?
        .into_iter()
        .map(RunView::from)
        .collect();

    Ok(Json(DataResponse { data: runs }))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/v1/runs/{run_id} and GET /api/status/{run_id}
///
/// Current state of one run. A pending run is checked against the provider
/// first, so polling completes runs even when the webhook never arrives.
pub async fn get_run(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let run = find_owned(&state, &run_id, &auth).await?;
    let run = refresh_from_provider(&state, run).await?;
    Ok(Json(DataResponse {
        data: RunView::from(run),
    }))
}
