//! Recording run completion from either channel.
//!
//! The provider webhook and the status endpoint both end up here. They are
//! not synchronized with each other; the store's set-if-absent update is
//! what keeps the first image URL and drops the rest.

use dreamrun_core::run::Run;
use dreamrun_core::store::{Completion, RunStore, RunStoreError};

use crate::state::AppState;

/// Which path observed the result.
#[derive(Debug, Clone, Copy)]
pub enum Channel {
    Webhook,
    Poll,
}

impl Channel {
    fn as_str(self) -> &'static str {
        match self {
            Channel::Webhook => "webhook",
            Channel::Poll => "poll",
        }
    }
}

/// Mark `run_id` complete with `image_url` and log what happened.
pub async fn record_completion(
    store: &dyn RunStore,
    run_id: &str,
    image_url: &str,
    channel: Channel,
) -> Result<Completion, RunStoreError> {
    let outcome = store.mark_complete(run_id, image_url).await?;
    match outcome {
        Completion::Completed => {
            tracing::info!(run_id, channel = channel.as_str(), image_url, "Run completed");
        }
        Completion::AlreadyComplete => {
            tracing::debug!(run_id, channel = channel.as_str(), "Run already complete, ignoring");
        }
        Completion::UnknownRun => {
            tracing::warn!(run_id, channel = channel.as_str(), "Completion for unknown run ignored");
        }
    }
    Ok(outcome)
}

/// Ask the provider about a pending run and record its image if it has one.
///
/// Best effort: provider errors are logged and the stored run is returned
/// unchanged. The call is bounded by the submitter's per-attempt timeout.
pub async fn refresh_from_provider(state: &AppState, run: Run) -> Result<Run, RunStoreError> {
    if run.is_complete() {
        return Ok(run);
    }

    let timeout = state.submitter.config().timeout;
    let update = match tokio::time::timeout(timeout, state.submitter.api().get_run(&run.run_id))
        .await
    {
        Ok(Ok(update)) => update,
        Ok(Err(e)) => {
            tracing::debug!(run_id = %run.run_id, error = %e, "Provider status lookup failed");
            return Ok(run);
        }
        Err(_) => {
            tracing::debug!(run_id = %run.run_id, "Provider status lookup timed out");
            return Ok(run);
        }
    };

    let Some(image_url) = update.image_url() else {
        return Ok(run);
    };

    record_completion(state.store.as_ref(), &run.run_id, image_url, Channel::Poll).await?;
    Ok(state.store.get(&run.run_id).await?.unwrap_or(run))
}
