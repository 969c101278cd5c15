//! Provider completion callback.
//!
//! The provider may deliver a callback zero, one, or many times, and may
//! deliver it before or after a poller has already seen the result. Every
//! delivery is answered 200 once parsed so the provider stops retrying;
//! repeated or late deliveries change nothing.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use dreamrun_comfydeploy::callback::RunUpdate;
use dreamrun_core::error::CoreError;
use dreamrun_core::signature::{verify_webhook_signature, SIGNATURE_HEADER};
use dreamrun_core::store::Completion;
use serde::Serialize;

use crate::completion::{record_completion, Channel};
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Acknowledgement returned to the provider.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub run_id: String,
    /// Whether this delivery performed the pending -> complete transition.
    pub updated: bool,
}

/// POST /api/webhook
///
/// Record the run's image URL if the payload carries one. When a webhook
/// secret is configured, the `x-webhook-signature` header must hold the
/// hex HMAC-SHA256 of the raw body.
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    if let Some(secret) = &state.config.webhook_secret {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_webhook_signature(secret, &body, signature) {
            tracing::warn!("Rejected webhook with missing or invalid signature");
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid webhook signature".into(),
            )));
        }
    }

    let update: RunUpdate = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {e}")))?;

    let run_id = update
        .run_id()
        .ok_or_else(|| AppError::BadRequest("run_id is required".into()))?
        .to_string();

    let Some(image_url) = update.image_url() else {
        tracing::debug!(
            run_id = %run_id,
            status = update.status.as_deref().unwrap_or("unknown"),
            "Webhook without image, nothing to record",
        );
        return Ok(Json(DataResponse {
            data: WebhookAck {
                run_id,
                updated: false,
            },
        }));
    };

    let outcome =
        record_completion(state.store.as_ref(), &run_id, image_url, Channel::Webhook).await?;

    Ok(Json(DataResponse {
        data: WebhookAck {
            run_id,
            updated: outcome == Completion::Completed,
        },
    }))
}
