//! In-process stand-ins for the provider and the optimizer.
//!
//! Each mock is an `axum` router bound to `127.0.0.1:0`, replaying a
//! scripted list of replies and recording every request it receives.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};

/// One scripted reply.
#[derive(Clone)]
pub enum Reply {
    /// Respond immediately with this status and JSON body.
    Json(u16, serde_json::Value),
    /// Respond with a raw (possibly non-JSON) body.
    Raw(u16, &'static str),
    /// Sleep, then respond 200 with this run id.
    Delayed(Duration, &'static str),
}

impl Reply {
    pub fn accepted(run_id: &str) -> Self {
        Reply::Json(200, serde_json::json!({ "run_id": run_id }))
    }

    pub fn gateway_timeout() -> Self {
        Reply::Json(504, serde_json::json!({ "error": "gateway timeout" }))
    }
}

/// A request the mock received.
#[derive(Clone, Debug)]
pub struct Hit {
    pub at: Instant,
    pub authorization: Option<String>,
    pub body: serde_json::Value,
}

#[derive(Clone)]
struct MockState {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    hits: Arc<Mutex<Vec<Hit>>>,
}

/// A running mock HTTP endpoint.
pub struct MockEndpoint {
    pub url: String,
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl MockEndpoint {
    /// Serve `replies` in order at `POST {url}`; 500 once they run out.
    pub async fn start(path: &str, replies: Vec<Reply>) -> Self {
        let state = MockState {
            replies: Arc::new(Mutex::new(replies.into())),
            hits: Arc::new(Mutex::new(Vec::new())),
        };
        let hits = Arc::clone(&state.hits);

        let app = Router::new().route(path, post(handle)).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}{path}"),
            hits,
        }
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    pub fn hit_count(&self) -> usize {
        self.hits.lock().unwrap().len()
    }

    /// Gaps between consecutive requests.
    pub fn gaps(&self) -> Vec<Duration> {
        let hits = self.hits();
        hits.windows(2).map(|w| w[1].at - w[0].at).collect()
    }
}

async fn handle(
    State(state): State<MockState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    state.hits.lock().unwrap().push(Hit {
        at: Instant::now(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_str(&body).unwrap_or(serde_json::Value::Null),
    });

    let reply = state.replies.lock().unwrap().pop_front();
    match reply {
        Some(Reply::Json(status, body)) => {
            (StatusCode::from_u16(status).unwrap(), Json(body)).into_response()
        }
        Some(Reply::Raw(status, body)) => {
            (StatusCode::from_u16(status).unwrap(), body).into_response()
        }
        Some(Reply::Delayed(delay, run_id)) => {
            tokio::time::sleep(delay).await;
            Json(serde_json::json!({ "run_id": run_id })).into_response()
        }
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
