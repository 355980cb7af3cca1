//! Shared helpers for the relay integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use serde_json::json;
use story_relay::config::Config;
use story_relay::models::StoryEvent;
use story_relay::routes;
use story_relay::services::llm::OpenAiClient;
use story_relay::state::AppState;
use tower::ServiceExt;
use wiremock::MockServer;

pub const API_KEY: &str = "sk-test";

/// Builds the app against a mock OpenAI server, the same way `main.rs` does.
pub fn build_test_app(server: &MockServer) -> Router {
    let vars: HashMap<String, String> = [
        ("OPENAI_API_KEY", API_KEY.to_string()),
        ("OPENAI_BASE_URL", format!("{}/v1", server.uri())),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let config = Config::from_vars(&vars).unwrap();
    let model = Arc::new(OpenAiClient::new(&config));
    routes::router(AppState::new(config, model))
}

/// Renders text fragments the way the chat-completions endpoint streams them.
pub fn chat_stream_body(fragments: &[&str]) -> String {
    let mut body = String::from(
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
    );
    for fragment in fragments {
        let chunk = json!({ "choices": [{ "index": 0, "delta": { "content": fragment } }] });
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str("data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n");
    body.push_str("data: [DONE]\n\n");
    body
}

/// Sends a GET and returns the response with its body still unread.
pub async fn open(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let response = open(app, uri).await;
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_str(&body).unwrap())
}

/// Reads a whole event stream and decodes every `data:` line.
pub async fn get_events(app: Router, uri: &str) -> Vec<StoryEvent> {
    let (status, body) = get(app, uri).await;
    assert_eq!(status, StatusCode::OK, "body: {body}");

    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}
