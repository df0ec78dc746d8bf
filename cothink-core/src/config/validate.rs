//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    let relay_url = config.chat.relay_url.trim();
    if relay_url.is_empty() {
        errors.push("chat.relay_url must not be empty".to_string());
    } else if !relay_url.starts_with("http://") && !relay_url.starts_with("https://") {
        errors.push("chat.relay_url must be an http(s) URL".to_string());
    }
    if config.chat.session_key.trim().is_empty() {
        errors.push("chat.session_key must not be empty".to_string());
    }
    if config.chat.data_dir.trim().is_empty() {
        errors.push("chat.data_dir must not be empty".to_string());
    }
    if config.chat.history_limit == 0 {
        errors.push("chat.history_limit must be > 0".to_string());
    }
    if config.chat.default_persona.trim().is_empty() {
        errors.push("chat.default_persona must not be empty".to_string());
    }

    if !config.relay.route.starts_with('/') {
        errors.push("relay.route must start with '/'".to_string());
    }
    if config.relay.upstream.api_base.trim().is_empty() {
        errors.push("relay.upstream.api_base must not be empty".to_string());
    }
    if !(0.0..=2.0).contains(&config.relay.upstream.temperature) {
        errors.push("relay.upstream.temperature must be in [0.0, 2.0]".to_string());
    }

    if !config.prompt.template.contains("{name}") {
        errors.push("prompt.template must contain the {name} placeholder".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}
