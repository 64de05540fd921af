//! HTTP surface, exercised with `tower::ServiceExt::oneshot`

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::setup;
use content_pipeline::api::create_router;

async fn call(app: axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health_endpoints() {
    let env = setup().await;

    let (status, body) = call(create_router(env.state.clone()), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = call(create_router(env.state.clone()), "GET", "/api/v1/system/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_generate_then_status() {
    let env = setup().await;

    let (status, body) = call(
        create_router(env.state.clone()),
        "POST",
        "/api/v1/generate",
        Some(json!({"postId": "post-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["postId"], "post-1");
    assert_eq!(body["runId"], "run-1");
    assert_eq!(body["status"], "processing");

    let (status, body) = call(create_router(env.state.clone()), "GET", "/api/v1/runs/run-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "processing");
    assert!(body.get("resultUri").is_none());

    let (status, _) = call(
        create_router(env.state.clone()),
        "POST",
        "/api/v1/generate",
        Some(json!({"postId": "post-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(create_router(env.state.clone()), "GET", "/api/v1/posts/post-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["runId"], "run-1");
}

#[tokio::test]
async fn test_generate_validation_errors() {
    let env = setup().await;

    let cases = [
        (json!({"postId": ""}), StatusCode::UNPROCESSABLE_ENTITY),
        (json!({"postId": "nope"}), StatusCode::NOT_FOUND),
        (json!({"postId": "post-off"}), StatusCode::UNPROCESSABLE_ENTITY),
    ];
    for (body, expected) in cases {
        let (status, response) =
            call(create_router(env.state.clone()), "POST", "/api/v1/generate", Some(body)).await;
        assert_eq!(status, expected);
        assert!(response["message"].is_string());
        assert!(response["code"].is_string());
    }
    assert_eq!(env.workflow.count(), 0);

    let (status, _) = call(create_router(env.state.clone()), "GET", "/api/v1/runs/run-404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_step_endpoint_runs_step_and_names_errors() {
    let env = setup().await;
    env.state.trigger.trigger("post-1").await.unwrap();

    let (status, body) = call(
        create_router(env.state.clone()),
        "POST",
        "/api/v1/steps/research",
        Some(json!({"postId": "post-1", "websiteId": "site-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["researchArticleUri"]
        .as_str()
        .unwrap()
        .ends_with("site-1/post-1/research_article.md"));

    let (status, body) = call(
        create_router(env.state.clone()),
        "POST",
        "/api/v1/steps/research",
        Some(json!({"postId": "post-1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Step.Terminal");
    assert_eq!(body["retryable"], false);

    let (status, _) = call(
        create_router(env.state.clone()),
        "POST",
        "/api/v1/steps/publish",
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
