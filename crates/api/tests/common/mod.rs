#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use dreamrun_api::auth::jwt::{generate_access_token, JwtConfig};
use dreamrun_api::config::ServerConfig;
use dreamrun_api::router::build_app_router;
use dreamrun_api::state::AppState;
use dreamrun_comfydeploy::{ComfyDeployConfig, JobSubmitter, PromptOptimizer};
use dreamrun_core::store::{MemoryRunStore, RunStore};
use dreamrun_core::types::DbId;

/// Base URL the test config advertises to the provider.
pub const PUBLIC_URL: &str = "https://dreamrun.test";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        public_url: Some(PUBLIC_URL.to_string()),
        webhook_secret: None,
        jwt: JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Provider tuning for tests: short timeout, tiny backoff.
pub fn provider_config(api_url: &str) -> ComfyDeployConfig {
    let mut config = ComfyDeployConfig::new("test-key", "test-deployment");
    config.api_url = api_url.to_string();
    config.timeout = Duration::from_secs(2);
    config.max_retries = 3;
    config.backoff = Duration::from_millis(10);
    config
}

/// A fully wired application plus handles on its collaborators.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryRunStore>,
    pub config: ServerConfig,
}

/// Build the full application router around an in-memory store and a
/// provider at `provider_url`.
pub fn build_test_app(provider_url: &str) -> TestApp {
    build_test_app_with(provider_url, test_config())
}

pub fn build_test_app_with(provider_url: &str, config: ServerConfig) -> TestApp {
    let store = Arc::new(MemoryRunStore::new());
    let dyn_store: Arc<dyn RunStore> = store.clone();
    let submitter = Arc::new(JobSubmitter::new(
        provider_config(provider_url),
        PromptOptimizer::disabled(),
        Arc::clone(&dyn_store),
    ));

    let state = AppState {
        store: dyn_store,
        submitter,
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        config,
    }
}

/// Mint an access token for `user_id` signed with the test secret.
pub fn token(user_id: DbId) -> String {
    generate_access_token(user_id, &test_config().jwt).unwrap()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json_auth(app: Router, uri: &str, body: Value, token: &str) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a raw body with extra headers, as the provider would.
pub async fn post_raw(app: Router, uri: &str, body: &str, headers: &[(&str, &str)]) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    app.oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Mock provider
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct ProviderState {
    queue_replies: Arc<Mutex<VecDeque<(u16, Value)>>>,
    status_reply: Arc<Mutex<(u16, Value)>>,
    queued: Arc<Mutex<Vec<Value>>>,
    status_calls: Arc<Mutex<usize>>,
}

/// In-process stand-in for the provider run endpoint.
///
/// `POST` replays `queue_replies` in order (500 once exhausted). `GET`
/// always answers with the current status reply.
pub struct MockProvider {
    pub url: String,
    state: ProviderState,
}

impl MockProvider {
    pub async fn start(queue_replies: Vec<(u16, Value)>) -> Self {
        let state = ProviderState {
            queue_replies: Arc::new(Mutex::new(queue_replies.into())),
            status_reply: Arc::new(Mutex::new((
                200,
                serde_json::json!({ "status": "running" }),
            ))),
            queued: Arc::new(Mutex::new(Vec::new())),
            status_calls: Arc::new(Mutex::new(0)),
        };

        let app = Router::new()
            .route("/api/run", post(queue).get(status))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}/api/run"),
            state,
        }
    }

    /// Provider that accepts one run with `run_id`.
    pub async fn accepting(run_id: &str) -> Self {
        Self::start(vec![(200, serde_json::json!({ "run_id": run_id }))]).await
    }

    pub fn set_status(&self, status: u16, body: Value) {
        *self.state.status_reply.lock().unwrap() = (status, body);
    }

    pub fn queued(&self) -> Vec<Value> {
        self.state.queued.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        *self.state.status_calls.lock().unwrap()
    }
}

async fn queue(State(state): State<ProviderState>, Json(body): Json<Value>) -> Response {
    state.queued.lock().unwrap().push(body);
    match state.queue_replies.lock().unwrap().pop_front() {
        Some((status, body)) => (StatusCode::from_u16(status).unwrap(), Json(body)).into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn status(State(state): State<ProviderState>) -> Response {
    *state.status_calls.lock().unwrap() += 1;
    let (status, body) = state.status_reply.lock().unwrap().clone();
    (StatusCode::from_u16(status).unwrap(), Json(body)).into_response()
}
