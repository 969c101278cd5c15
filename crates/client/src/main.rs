//! `dreamrun` -- submit a prompt and wait for the image.
//!
//! Usage: `dreamrun <prompt words...>`. Prints the image URL on success.
//!
//! # Environment variables
//!
//! | Variable           | Required | Default                  | Description                  |
//! |--------------------|----------|--------------------------|------------------------------|
//! | `DREAMRUN_API_URL` | no       | `http://localhost:3000`  | API base URL                 |
//! | `DREAMRUN_TOKEN`   | yes      | --                       | Bearer token for the API     |
//! | `POLL_INTERVAL_MS` | no       | `5000`                   | Milliseconds between checks  |

use std::sync::Arc;
use std::time::Duration;

use dreamrun_client::poller::{self, DEFAULT_POLL_INTERVAL};
use dreamrun_client::DreamrunClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_API_URL: &str = "http://localhost:3000";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dreamrun_client=info,dreamrun=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let api_url = std::env::var("DREAMRUN_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());

    let token = std::env::var("DREAMRUN_TOKEN").unwrap_or_else(|_| {
        tracing::error!("DREAMRUN_TOKEN environment variable is required");
        std::process::exit(1);
    });

    let interval = std::env::var("POLL_INTERVAL_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_POLL_INTERVAL);

    let prompt = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if prompt.trim().is_empty() {
        tracing::error!("Usage: dreamrun <prompt>");
        std::process::exit(2);
    }

    let client = Arc::new(DreamrunClient::new(api_url, token));

    let run_id = match client.submit(&prompt).await {
        Ok(run_id) => run_id,
        Err(e) if e.is_suppressible() => {
            tracing::warn!(error = %e, "Image provider is busy, try again shortly");
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, "Submission failed");
            std::process::exit(1);
        }
    };

    tracing::info!(
        run_id = %run_id,
        interval_ms = interval.as_millis() as u64,
        "Run queued, waiting for image",
    );

    let mut handle = poller::spawn(client, run_id, interval);

    let completed = tokio::select! {
        view = handle.completed() => view,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping poller");
            None
        }
    };

    handle.cancel().await;

    match completed.and_then(|view| view.image_url) {
        Some(url) => println!("{url}"),
        None => std::process::exit(130),
    }
}
