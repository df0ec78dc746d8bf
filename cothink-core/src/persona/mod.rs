//! Persona table and system-prompt composition
//!
//! A persona is a user-selectable assistant identity mapped to an upstream
//! model identifier. The built-in table is embedded from `personas.yaml`.

use serde::{Deserialize, Serialize};

use crate::config::PromptConfig;
use crate::session::WireMessage;

/// Name used in the system prompt when a model string matches no persona
pub const UNKNOWN_PERSONA_NAME: &str = "AI";

/// One assistant persona
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Persona {
    pub id: String,
    /// Display name, also used to address the model in the system prompt
    pub name: String,
    /// Upstream model identifier
    pub model: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Registry of selectable personas
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: Vec<Persona>,
}

impl PersonaRegistry {
    /// Create a registry with the built-in personas
    pub fn new() -> Self {
        Self::from_yaml(include_str!("personas.yaml"))
            .expect("Failed to parse built-in persona table")
    }

    /// Parse a persona table from YAML
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        let personas: Vec<Persona> = serde_yaml::from_str(yaml)?;
        if personas.is_empty() {
            return Err(crate::Error::Config("persona table is empty".to_string()));
        }
        Ok(Self { personas })
    }

    /// Get all personas in table order
    pub fn all(&self) -> &[Persona] {
        &self.personas
    }

    /// Number of personas
    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    /// Find a persona by id
    pub fn get(&self, id: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    /// Find the persona an upstream model string belongs to.
    ///
    /// Exact model matches win; otherwise the first persona with a keyword
    /// contained in the (lowercased) model string.
    pub fn find_by_model(&self, model: &str) -> Option<&Persona> {
        if let Some(persona) = self.personas.iter().find(|p| p.model == model) {
            return Some(persona);
        }
        let model_lower = model.to_lowercase();
        self.personas
            .iter()
            .find(|p| p.keywords.iter().any(|kw| model_lower.contains(kw.as_str())))
    }

    /// Display name for an upstream model string, `"AI"` when unknown
    pub fn name_for_model(&self, model: &str) -> &str {
        self.find_by_model(model)
            .map(|p| p.name.as_str())
            .unwrap_or(UNKNOWN_PERSONA_NAME)
    }
}

impl Default for PersonaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Render the system prompt for a persona.
///
/// The concise clause is only present when `concise` is set.
pub fn build_system_prompt(
    prompt: &PromptConfig,
    persona_name: &str,
    persona_count: usize,
    concise: bool,
) -> String {
    let mut text = prompt
        .template
        .replace("{name}", persona_name)
        .replace("{count}", &count_word(persona_count));
    if concise && !prompt.concise_clause.is_empty() {
        text.push(' ');
        text.push_str(&prompt.concise_clause);
    }
    text
}

/// The message sequence sent upstream: system prompt, prior turns, new utterance.
pub fn compose_upstream_messages(
    system_prompt: String,
    history: Vec<WireMessage>,
    utterance: &str,
) -> Vec<WireMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(WireMessage::system(system_prompt));
    messages.extend(history);
    messages.push(WireMessage::user(utterance));
    messages
}

fn count_word(n: usize) -> String {
    const WORDS: [&str; 11] = [
        "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    ];
    WORDS
        .get(n)
        .map(|w| w.to_string())
        .unwrap_or_else(|| n.to_string())
}
