//! HTTP client for the relay endpoint

use async_trait::async_trait;
use cothink_core::persona::PersonaRegistry;
use cothink_core::session::WireMessage;
use reqwest::Client;
use tracing::{debug, warn};

use crate::base::{extract_reply, ChatRelay, RelayError, RelayRequest, RelayResult, NO_REPLY};

/// Posts chat requests to the relay and normalizes its replies
pub struct RelayClient {
    client: Client,
    endpoint: String,
    personas: PersonaRegistry,
}

impl RelayClient {
    /// Create a client for the relay at `endpoint`
    pub fn new(endpoint: impl Into<String>, personas: PersonaRegistry) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            personas,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn personas(&self) -> &PersonaRegistry {
        &self.personas
    }

    /// Build the relay body for a persona, resolving its upstream model
    pub fn build_request(
        &self,
        persona_id: &str,
        utterance: &str,
        concise: bool,
        history: Vec<WireMessage>,
    ) -> RelayResult<RelayRequest> {
        let persona = self
            .personas
            .get(persona_id)
            .ok_or_else(|| RelayError::UnknownPersona(persona_id.to_string()))?;

        Ok(RelayRequest {
            model: persona.model.clone(),
            user_message: utterance.to_string(),
            concise_mode: concise,
            message_history: history,
        })
    }
}

#[async_trait]
impl ChatRelay for RelayClient {
    async fn send(
        &self,
        persona_id: &str,
        utterance: &str,
        concise: bool,
        history: Vec<WireMessage>,
    ) -> RelayResult<String> {
        let request = self.build_request(persona_id, utterance, concise, history)?;

        debug!(
            "Sending chat request to {} with model {} ({} history messages, concise={})",
            self.endpoint,
            request.model,
            request.message_history.len(),
            request.concise_mode
        );

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Relay returned HTTP {}: {}", status, body);
            return Err(RelayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let value: serde_json::Value = serde_json::from_str(&body)?;
        match extract_reply(&value) {
            Some(reply) => Ok(reply),
            None => {
                warn!("Relay reply had no message content, using placeholder");
                Ok(NO_REPLY.to_string())
            }
        }
    }
}
