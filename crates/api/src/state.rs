use std::sync::Arc;

use dreamrun_comfydeploy::JobSubmitter;
use dreamrun_core::store::RunStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Durable run records (PostgreSQL in production).
    pub store: Arc<dyn RunStore>,
    /// Provider client with retry policy; writes accepted runs to `store`.
    pub submitter: Arc<JobSubmitter>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
