//! OpenRouter chat-completion client used by the relay

use async_trait::async_trait;
use cothink_core::config::UpstreamConfig;
use cothink_core::session::WireMessage;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::base::{ProviderError, ProviderResult, UpstreamChat};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
}

/// OpenRouter provider client
pub struct OpenRouterClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    referer: String,
    title: String,
    temperature: f32,
}

impl OpenRouterClient {
    /// Create a client from the relay's upstream settings
    pub fn new(config: &UpstreamConfig) -> Self {
        let api_key = Some(config.api_key.trim().to_string()).filter(|k| !k.is_empty());
        Self {
            client: Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            referer: config.referer.clone(),
            title: config.title.clone(),
            temperature: config.temperature,
        }
    }

    fn apply_headers(&self, mut req_builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(api_key) = &self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }
        if !self.referer.is_empty() {
            req_builder = req_builder.header("HTTP-Referer", &self.referer);
        }
        if !self.title.is_empty() {
            req_builder = req_builder.header("X-Title", &self.title);
        }
        req_builder
    }
}

#[async_trait]
impl UpstreamChat for OpenRouterClient {
    async fn complete(
        &self,
        model: &str,
        messages: Vec<WireMessage>,
    ) -> ProviderResult<serde_json::Value> {
        if self.api_key.is_none() {
            return Err(ProviderError::ConfigError(
                "OPENROUTER_API_KEY not configured".to_string(),
            ));
        }

        let request = ChatCompletionRequest {
            model,
            messages,
            temperature: self.temperature,
        };

        debug!(
            "Sending chat request to {} with model {}",
            self.api_base, model
        );

        let url = format!("{}/chat/completions", self.api_base);
        let response = self
            .apply_headers(self.client.post(&url).json(&request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("Upstream response status: {}", status);

        if !status.is_success() {
            return Err(ProviderError::ApiError(format!("API error: {}", body)));
        }

        Ok(serde_json::from_str(&body)?)
    }

    fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}
