//! HTTP-level integration tests for run submission and status.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, get_auth, post_json, post_json_auth, token, MockProvider};
use dreamrun_core::generation::build_inputs;
use dreamrun_core::store::RunStore;
use serde_json::json;

fn gateway_timeout() -> (u16, serde_json::Value) {
    (504, json!({ "error": "gateway timeout" }))
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_returns_201_with_run_id() {
    let provider = MockProvider::accepting("run-abc").await;
    let app = common::build_test_app(&provider.url);

    let response = post_json_auth(
        app.router,
        "/api/v1/runs",
        json!({ "prompt": "a lighthouse in fog" }),
        &token(7),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["run_id"], "run-abc");

    let run = app.store.get("run-abc").await.unwrap().expect("run stored");
    assert_eq!(run.user_id, 7);
    assert_eq!(run.inputs.input_text, "a lighthouse in fog");
    assert!(!run.is_complete());
}

#[tokio::test]
async fn submit_hands_public_webhook_url_to_provider() {
    let provider = MockProvider::accepting("run-abc").await;
    let app = common::build_test_app(&provider.url);

    post_json_auth(
        app.router,
        "/api/v1/runs",
        json!({ "prompt": "a lighthouse in fog" }),
        &token(7),
    )
    .await;

    let queued = provider.queued();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0]["webhook"], format!("{}/api/webhook", common::PUBLIC_URL));
    assert_eq!(queued[0]["deployment_id"], "test-deployment");
    assert_eq!(queued[0]["inputs"]["width"], "832");
}

#[tokio::test]
async fn submit_without_token_returns_401_and_calls_nothing() {
    let provider = MockProvider::accepting("run-abc").await;
    let app = common::build_test_app(&provider.url);

    let response = post_json(app.router, "/api/v1/runs", json!({ "prompt": "a cat" })).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(provider.queued().is_empty());
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn submit_with_bad_token_returns_401() {
    let provider = MockProvider::accepting("run-abc").await;
    let app = common::build_test_app(&provider.url);

    let response = post_json_auth(
        app.router,
        "/api/v1/runs",
        json!({ "prompt": "a cat" }),
        "not-a-jwt",
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(provider.queued().is_empty());
}

#[tokio::test]
async fn submit_blank_prompt_returns_400() {
    let provider = MockProvider::accepting("run-abc").await;
    let app = common::build_test_app(&provider.url);

    let response =
        post_json_auth(app.router, "/api/v1/runs", json!({ "prompt": "   " }), &token(7)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(provider.queued().is_empty());
}

#[tokio::test]
async fn submit_exhausting_retries_returns_504_provider_timeout() {
    let provider =
        MockProvider::start(vec![gateway_timeout(), gateway_timeout(), gateway_timeout()]).await;
    let app = common::build_test_app(&provider.url);

    let response =
        post_json_auth(app.router, "/api/v1/runs", json!({ "prompt": "a cat" }), &token(7)).await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "PROVIDER_TIMEOUT");
    assert_eq!(provider.queued().len(), 3);
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn submit_recovers_after_one_gateway_timeout() {
    let provider =
        MockProvider::start(vec![gateway_timeout(), (200, json!({ "run_id": "run-2" }))]).await;
    let app = common::build_test_app(&provider.url);

    let response =
        post_json_auth(app.router, "/api/v1/runs", json!({ "prompt": "a cat" }), &token(7)).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["data"]["run_id"], "run-2");
    assert_eq!(provider.queued().len(), 2);
}

#[tokio::test]
async fn submit_without_run_id_in_reply_returns_502() {
    let provider = MockProvider::start(vec![(200, json!({ "status": "queued" }))]).await;
    let app = common::build_test_app(&provider.url);

    let response =
        post_json_auth(app.router, "/api/v1/runs", json!({ "prompt": "a cat" }), &token(7)).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INVALID_PROVIDER_RESPONSE");
    assert_eq!(provider.queued().len(), 1, "malformed replies are not retried");
    assert!(app.store.is_empty().await);
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_of_pending_run_stays_pending_while_provider_runs() {
    let provider = MockProvider::accepting("unused").await;
    let app = common::build_test_app(&provider.url);
    app.store
        .create("run-1", 7, &build_inputs("a cat"))
        .await
        .unwrap();

    let response = get_auth(app.router, "/api/status/run-1", &token(7)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["run_id"], "run-1");
    assert_eq!(json["data"]["status"], "pending");
    assert!(json["data"]["image_url"].is_null());
    assert_eq!(provider.status_calls(), 1);
}

#[tokio::test]
async fn status_completes_run_from_provider_when_webhook_missing() {
    let provider = MockProvider::accepting("unused").await;
    provider.set_status(
        200,
        json!({
            "id": "run-1",
            "status": "success",
            "outputs": [{ "data": { "images": [{ "url": "https://cdn.test/1.png" }] } }]
        }),
    );
    let app = common::build_test_app(&provider.url);
    app.store
        .create("run-1", 7, &build_inputs("a cat"))
        .await
        .unwrap();

    let response = get_auth(app.router, "/api/v1/runs/run-1", &token(7)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "complete");
    assert_eq!(json["data"]["image_url"], "https://cdn.test/1.png");

    let run = app.store.get("run-1").await.unwrap().unwrap();
    assert_eq!(run.image_url.as_deref(), Some("https://cdn.test/1.png"));
}

#[tokio::test]
async fn status_of_complete_run_skips_provider() {
    let provider = MockProvider::accepting("unused").await;
    let app = common::build_test_app(&provider.url);
    app.store
        .create("run-1", 7, &build_inputs("a cat"))
        .await
        .unwrap();
    app.store
        .mark_complete("run-1", "https://cdn.test/first.png")
        .await
        .unwrap();

    let response = get_auth(app.router, "/api/status/run-1", &token(7)).await;

    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "complete");
    assert_eq!(json["data"]["image_url"], "https://cdn.test/first.png");
    assert!(json["data"]["completed_at"].is_string());
    assert_eq!(provider.status_calls(), 0);
}

#[tokio::test]
async fn status_survives_provider_errors() {
    let provider = MockProvider::accepting("unused").await;
    provider.set_status(500, json!({ "error": "boom" }));
    let app = common::build_test_app(&provider.url);
    app.store
        .create("run-1", 7, &build_inputs("a cat"))
        .await
        .unwrap();

    let response = get_auth(app.router, "/api/status/run-1", &token(7)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "pending");
}

#[tokio::test]
async fn status_of_unknown_run_returns_404() {
    let provider = MockProvider::accepting("unused").await;
    let app = common::build_test_app(&provider.url);

    let response = get_auth(app.router, "/api/status/nope", &token(7)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_of_other_users_run_returns_404() {
    let provider = MockProvider::accepting("unused").await;
    let app = common::build_test_app(&provider.url);
    app.store
        .create("run-1", 7, &build_inputs("a cat"))
        .await
        .unwrap();

    let response = get_auth(app.router, "/api/status/run-1", &token(8)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(provider.status_calls(), 0);
}

#[tokio::test]
async fn status_requires_authentication() {
    let provider = MockProvider::accepting("unused").await;
    let app = common::build_test_app(&provider.url);

    let response = get(app.router, "/api/status/run-1").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_returns_only_callers_runs() {
    let provider = MockProvider::accepting("unused").await;
    let app = common::build_test_app(&provider.url);
    for (run_id, user_id) in [("run-1", 7), ("run-2", 8), ("run-3", 7)] {
        app.store
            .create(run_id, user_id, &build_inputs("a cat"))
            .await
            .unwrap();
    }

    let response = get_auth(app.router, "/api/v1/runs", &token(7)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let mut ids: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["run_id"].as_str().unwrap())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, ["run-1", "run-3"]);
}

#[tokio::test]
async fn list_respects_limit() {
    let provider = MockProvider::accepting("unused").await;
    let app = common::build_test_app(&provider.url);
    for run_id in ["run-1", "run-2", "run-3"] {
        app.store
            .create(run_id, 7, &build_inputs("a cat"))
            .await
            .unwrap();
    }

    let response = get_auth(app.router, "/api/v1/runs?limit=2", &token(7)).await;

    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}
