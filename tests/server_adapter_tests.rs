//! Wire-level tests for the Axum adapters.
#![cfg(feature = "server-adapters")]

mod support;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mediaforge::server_adapters::axum::{AppState, router};
use mediaforge::{Orchestrator, ProviderConfig};
use support::{RecordingStore, StaticVerifier};

async fn serve(server: &MockServer, store: Arc<RecordingStore>) -> SocketAddr {
    let config = ProviderConfig::new("test-key")
        .with_base_url(server.uri())
        .with_poll_interval(Duration::from_millis(10))
        .with_max_poll_attempts(5);
    let state = AppState {
        orchestrator: Arc::new(Orchestrator::new(config, store).unwrap()),
        sessions: Arc::new(StaticVerifier::new("valid-token", "user-123")),
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn video_endpoint_rejects_missing_and_invalid_sessions() {
    let provider = MockServer::start().await;
    let addr = serve(&provider, Arc::new(RecordingStore::new())).await;
    let http = reqwest::Client::new();

    let response = http
        .post(format!("http://{addr}/api/video/generate"))
        .json(&serde_json::json!({ "prompt": "a storm" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);

    let response = http
        .post(format!("http://{addr}/api/video/generate"))
        .header("Cookie", "auth_token=wrong-token")
        .json(&serde_json::json!({ "prompt": "a storm" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn video_endpoint_requires_a_prompt() {
    let provider = MockServer::start().await;
    let addr = serve(&provider, Arc::new(RecordingStore::new())).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/video/generate"))
        .header("Cookie", "auth_token=valid-token")
        .json(&serde_json::json!({ "model": "sora-2-pro" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Prompt is required");
}

#[tokio::test]
async fn video_endpoint_streams_frames_and_the_sentinel() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/videos"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "task-http" })),
        )
        .mount(&provider)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/videos/task-http"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "completed",
            "url": "http://vid.mp4"
        })))
        .mount(&provider)
        .await;

    let store = Arc::new(RecordingStore::new());
    let addr = serve(&provider, store.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/video/generate"))
        .header("Cookie", "auth_token=valid-token")
        .json(&serde_json::json!({ "prompt": "a storm", "model": "sora-2-pro" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/event-stream")
    );

    let body = response.text().await.unwrap();
    assert!(body.contains("[Download Video](http://vid.mp4)"));
    assert!(body.ends_with("data: [DONE]\n\n"));
    support::wait_for_records(&store, 1).await;
}

#[tokio::test]
async fn generate_endpoint_maps_upstream_failure_to_a_gateway_status() {
    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("provider down"))
        .mount(&provider)
        .await;

    let addr = serve(&provider, Arc::new(RecordingStore::new())).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/generate"))
        .json(&serde_json::json!({ "prompt": "a cat", "model": "nano-banana-pro", "count": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 502);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn generate_endpoint_returns_inline_candidates() {
    use base64::Engine;
    let encoded = base64::engine::general_purpose::STANDARD.encode(b"png-bytes");

    let provider = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [ { "message": {
                "role": "assistant",
                "content": format!("data:image/png;base64,{encoded}")
            } } ]
        })))
        .mount(&provider)
        .await;

    let addr = serve(&provider, Arc::new(RecordingStore::new())).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/generate"))
        .json(&serde_json::json!({ "prompt": "a cat", "model": "nano-banana-pro", "count": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    let candidates = body["candidates"].as_array().unwrap();
    assert_eq!(candidates.len(), 2);
    assert!(
        candidates
            .iter()
            .all(|c| c.as_str().unwrap().starts_with("data:"))
    );
}
