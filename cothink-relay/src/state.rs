use cothink_core::config::PromptConfig;
use cothink_core::persona::PersonaRegistry;
use cothink_providers::UpstreamChat;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<dyn UpstreamChat>,
    pub personas: Arc<PersonaRegistry>,
    pub prompt: Arc<PromptConfig>,
}

impl AppState {
    pub fn new(
        upstream: Arc<dyn UpstreamChat>,
        personas: PersonaRegistry,
        prompt: PromptConfig,
    ) -> Self {
        Self {
            upstream,
            personas: Arc::new(personas),
            prompt: Arc::new(prompt),
        }
    }
}
