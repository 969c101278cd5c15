use axum::routing::post;
use axum::Router;

use crate::handlers::webhook;
use crate::state::AppState;

/// Provider callback. Unauthenticated; optionally HMAC-signed.
pub fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(webhook::receive_webhook))
}
