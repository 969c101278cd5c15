use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use dreamrun_comfydeploy::SubmissionError;
use dreamrun_core::error::CoreError;
use dreamrun_core::store::RunStoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors, the submitter and store errors, and
/// adds HTTP-specific variants. Implements [`IntoResponse`] to produce
/// consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `dreamrun_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failed job submission.
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    /// A run store failure outside of submission.
    #[error(transparent)]
    Store(#[from] RunStoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Submission errors ---
            AppError::Submission(err) => classify_submission_error(err),

            // --- Store errors ---
            AppError::Store(err) => classify_store_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Map a submission failure to an HTTP status, error code, and message.
///
/// Retry exhaustion is a low-severity condition: it is logged at `warn` and
/// carries its own `PROVIDER_TIMEOUT` code so clients can suppress it.
fn classify_submission_error(err: &SubmissionError) -> (StatusCode, &'static str, String) {
    match err {
        SubmissionError::Unauthenticated => (
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            err.to_string(),
        ),
        SubmissionError::InvalidPrompt(msg) => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
        }
        SubmissionError::RetriesExhausted { attempts } => {
            tracing::warn!(attempts, "Provider timed out on every attempt");
            (StatusCode::GATEWAY_TIMEOUT, "PROVIDER_TIMEOUT", err.to_string())
        }
        SubmissionError::InvalidResponse(msg) => {
            tracing::error!(error = %msg, "Provider rejected the run");
            (
                StatusCode::BAD_GATEWAY,
                "INVALID_PROVIDER_RESPONSE",
                "The image provider returned an invalid response".to_string(),
            )
        }
        SubmissionError::Store(store) => classify_store_error(store),
    }
}

/// Map a store failure to an HTTP status, error code, and message.
fn classify_store_error(err: &RunStoreError) -> (StatusCode, &'static str, String) {
    match err {
        RunStoreError::DuplicateJob(run_id) => {
            tracing::error!(run_id = %run_id, "Run id already recorded");
            (StatusCode::CONFLICT, "DUPLICATE_JOB", err.to_string())
        }
        RunStoreError::Backend(msg) => {
            tracing::error!(error = %msg, "Run store error");
            internal()
        }
    }
}
