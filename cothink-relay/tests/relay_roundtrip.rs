//! Relay client → relay service → mocked OpenRouter

use cothink_core::config::{PromptConfig, UpstreamConfig};
use cothink_core::persona::PersonaRegistry;
use cothink_core::session::WireMessage;
use cothink_providers::{ChatRelay, OpenRouterClient, RelayClient, RelayError};
use cothink_relay::{build_router, AppState};
use mockito::Matcher;
use serde_json::json;
use std::sync::Arc;

async fn spawn_relay(upstream_url: String, api_key: &str) -> String {
    let upstream = OpenRouterClient::new(&UpstreamConfig {
        api_key: api_key.to_string(),
        api_base: upstream_url,
        ..UpstreamConfig::default()
    });
    let state = AppState::new(
        Arc::new(upstream),
        PersonaRegistry::new(),
        PromptConfig::default(),
    );
    let app = build_router(state, "/api/chat");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/chat", addr)
}

#[tokio::test]
async fn reply_flows_back_through_relay() {
    let mut upstream = mockito::Server::new_async().await;
    let mock = upstream
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-or-test")
        .match_body(Matcher::PartialJson(json!({
            "model": "anthropic/claude-3-haiku",
            "messages": [
                {"role": "system"},
                {"role": "assistant", "content": "Earlier"},
                {"role": "user", "content": "Hello"}
            ]
        })))
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"content":"Hi there"}}]}"#)
        .create_async()
        .await;

    let endpoint = spawn_relay(upstream.url(), "sk-or-test").await;
    let client = RelayClient::new(endpoint, PersonaRegistry::new());
    let reply = client
        .send("haiku", "Hello", false, vec![WireMessage::assistant("Earlier")])
        .await
        .unwrap();

    assert_eq!(reply, "Hi there");
    mock.assert_async().await;
}

#[tokio::test]
async fn missing_key_surfaces_as_status_error() {
    let upstream = mockito::Server::new_async().await;
    let endpoint = spawn_relay(upstream.url(), "").await;
    let client = RelayClient::new(endpoint, PersonaRegistry::new());

    let err = client
        .send("grok", "Hello", false, Vec::new())
        .await
        .unwrap_err();

    match err {
        RelayError::Status { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("OPENROUTER_API_KEY not configured"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
