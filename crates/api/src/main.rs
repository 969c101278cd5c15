use std::net::SocketAddr;
use std::sync::Arc;

use dreamrun_comfydeploy::{ComfyDeployConfig, JobSubmitter, OptimizerConfig, PromptOptimizer};
use dreamrun_core::store::{MemoryRunStore, RunStore};
use dreamrun_db::PgRunStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dreamrun_api::config::ServerConfig;
use dreamrun_api::router::build_app_router;
use dreamrun_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "dreamrun_api=debug,dreamrun_comfydeploy=debug,tower_http=debug".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let provider_config = ComfyDeployConfig::from_env();
    tracing::info!(
        api_url = %provider_config.api_url,
        timeout_ms = provider_config.timeout.as_millis() as u64,
        max_retries = provider_config.max_retries,
        backoff_ms = provider_config.backoff.as_millis() as u64,
        "Loaded provider configuration",
    );
    if provider_config.worst_case().as_secs() >= config.request_timeout_secs {
        tracing::warn!(
            worst_case_secs = provider_config.worst_case().as_secs(),
            request_timeout_secs = config.request_timeout_secs,
            "Request timeout does not cover the submitter's worst case",
        );
    }

    let optimizer = PromptOptimizer::new(&OptimizerConfig::from_env());
    tracing::info!(enabled = optimizer.is_enabled(), "Prompt optimizer configured");

    // --- Run store ---
    let store: Arc<dyn RunStore> = match std::env::var("RUN_STORE").as_deref() {
        Ok("memory") => {
            tracing::warn!("Using in-memory run store, runs are lost on restart");
            Arc::new(MemoryRunStore::new())
        }
        _ => {
            let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

            let pool = dreamrun_db::create_pool(&database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            dreamrun_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            dreamrun_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(PgRunStore::new(pool))
        }
    };

    // --- App state ---
    let submitter = Arc::new(JobSubmitter::new(
        provider_config,
        optimizer,
        Arc::clone(&store),
    ));
    let state = AppState {
        store,
        submitter,
        config: Arc::new(config.clone()),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
