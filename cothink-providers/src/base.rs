//! Relay wire types and the relay trait

use async_trait::async_trait;
use cothink_core::config::PromptConfig;
use cothink_core::persona::{build_system_prompt, compose_upstream_messages, PersonaRegistry};
use cothink_core::session::WireMessage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Text used when a successful reply carries no content
pub const NO_REPLY: &str = "No reply";

/// Error type for relay calls made by the front end
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Relay returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown persona: {0}")]
    UnknownPersona(String),
}

pub type RelayResult<T> = Result<T, RelayError>;

/// Error type for calls from the relay to the upstream provider
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{0}")]
    ApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Body the front end posts to the relay endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    /// Upstream model identifier
    pub model: String,
    pub user_message: String,
    #[serde(default)]
    pub concise_mode: bool,
    #[serde(default)]
    pub message_history: Vec<WireMessage>,
}

impl RelayRequest {
    /// The message sequence forwarded upstream for this request
    pub fn upstream_messages(
        &self,
        personas: &PersonaRegistry,
        prompt: &PromptConfig,
    ) -> Vec<WireMessage> {
        let name = personas.name_for_model(&self.model);
        let system_prompt = build_system_prompt(prompt, name, personas.len(), self.concise_mode);
        compose_upstream_messages(
            system_prompt,
            self.message_history.clone(),
            &self.user_message,
        )
    }
}

/// Content of the first completion choice, if present and non-empty
pub fn extract_reply(response: &serde_json::Value) -> Option<String> {
    response
        .pointer("/choices/0/message/content")
        .and_then(serde_json::Value::as_str)
        .filter(|content| !content.is_empty())
        .map(ToString::to_string)
}

/// Sends one utterance to an assistant persona and returns its reply text
#[async_trait]
pub trait ChatRelay: Send + Sync {
    async fn send(
        &self,
        persona_id: &str,
        utterance: &str,
        concise: bool,
        history: Vec<WireMessage>,
    ) -> RelayResult<String>;
}

/// Chat-completion provider the relay forwards to
#[async_trait]
pub trait UpstreamChat: Send + Sync {
    /// Run a completion and return the provider's raw JSON response
    async fn complete(
        &self,
        model: &str,
        messages: Vec<WireMessage>,
    ) -> ProviderResult<serde_json::Value>;

    /// Whether a credential is configured
    fn has_api_key(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use cothink_core::session::WireRole;
    use serde_json::json;

    #[test]
    fn test_request_uses_camel_case() {
        let request = RelayRequest {
            model: "x-ai/grok-3-mini".to_string(),
            user_message: "Hello".to_string(),
            concise_mode: true,
            message_history: vec![WireMessage::assistant("Hi")],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "x-ai/grok-3-mini",
                "userMessage": "Hello",
                "conciseMode": true,
                "messageHistory": [{"role": "assistant", "content": "Hi"}]
            })
        );
    }

    #[test]
    fn test_request_history_defaults_to_empty() {
        let request: RelayRequest =
            serde_json::from_value(json!({"model": "m", "userMessage": "u"})).unwrap();
        assert!(request.message_history.is_empty());
        assert!(!request.concise_mode);
    }

    #[test]
    fn test_upstream_messages_name_the_persona() {
        let request = RelayRequest {
            model: "openai/gpt-3.5-turbo".to_string(),
            user_message: "Hello".to_string(),
            concise_mode: false,
            message_history: vec![WireMessage::assistant("Hi")],
        };
        let messages =
            request.upstream_messages(&PersonaRegistry::new(), &PromptConfig::default());

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, WireRole::System);
        assert!(messages[0].content.starts_with("You are ChatGPT"));
        assert_eq!(messages[2], WireMessage::user("Hello"));
    }

    #[test]
    fn test_extract_reply() {
        let ok = json!({"choices": [{"message": {"content": "Hi there"}}]});
        assert_eq!(extract_reply(&ok).as_deref(), Some("Hi there"));

        assert!(extract_reply(&json!({"choices": []})).is_none());
        assert!(extract_reply(&json!({"choices": [{"message": {"content": ""}}]})).is_none());
        assert!(extract_reply(&json!({"choices": [{"message": {"content": null}}]})).is_none());
        assert!(extract_reply(&json!({"error": "boom"})).is_none());
    }
}
