//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root configuration for cothink
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Front-end chat settings
    #[serde(default)]
    pub chat: ChatConfig,
    /// Relay service settings
    #[serde(default)]
    pub relay: RelayConfig,
    /// System prompt wording
    #[serde(default)]
    pub prompt: PromptConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "~/.cothink/logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

/// Front-end chat settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// URL of the relay endpoint the client posts to
    #[serde(default = "default_relay_url")]
    pub relay_url: String,
    /// Directory holding the persisted session
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Key under which the session is persisted
    #[serde(default = "default_session_key")]
    pub session_key: String,
    /// Persona selected at startup
    #[serde(default = "default_persona")]
    pub default_persona: String,
    /// Whether concise mode starts enabled
    #[serde(default)]
    pub concise_mode: bool,
    /// Number of prior messages sent as context
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_relay_url() -> String {
    "http://127.0.0.1:8888/api/chat".to_string()
}

fn default_data_dir() -> String {
    "~/.cothink/data".to_string()
}

fn default_session_key() -> String {
    "chatMessages".to_string()
}

fn default_persona() -> String {
    "grok".to_string()
}

fn default_history_limit() -> usize {
    30
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            relay_url: default_relay_url(),
            data_dir: default_data_dir(),
            session_key: default_session_key(),
            default_persona: default_persona(),
            concise_mode: false,
            history_limit: default_history_limit(),
        }
    }
}

/// Relay service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Route the chat handler is mounted on
    #[serde(default = "default_route")]
    pub route: String,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8888
}

fn default_route() -> String {
    "/api/chat".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            route: default_route(),
            upstream: UpstreamConfig::default(),
        }
    }
}

/// Upstream chat-completion provider settings, only read by the relay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Value of the `HTTP-Referer` attribution header
    #[serde(default = "default_referer")]
    pub referer: String,
    /// Value of the `X-Title` attribution header
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_api_base() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_referer() -> String {
    "https://concise-chat.netlify.app".to_string()
}

fn default_title() -> String {
    "Conference Chat Demo".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            referer: default_referer(),
            title: default_title(),
            temperature: default_temperature(),
        }
    }
}

/// System prompt wording.
///
/// `template` may use `{name}` (persona display name) and `{count}` (number
/// of personas, spelled out). `concise_clause` is appended after a space when
/// concise mode is on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptConfig {
    #[serde(default = "default_prompt_template")]
    pub template: String,
    #[serde(default = "default_concise_clause")]
    pub concise_clause: String,
}

fn default_prompt_template() -> String {
    "You are {name}, one of {count} AI voices in a multi-agent chat. \
     Each message shows which AI said it. \
     Respond as yourself and feel free to comment on what other AIs have said. \
     Don't adopt personas, just be {name}."
        .to_string()
}

fn default_concise_clause() -> String {
    "This response should be 2-3 sentences as 'concise mode' has been toggled.".to_string()
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            template: default_prompt_template(),
            concise_clause: default_concise_clause(),
        }
    }
}
