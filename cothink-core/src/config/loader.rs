//! Layered configuration loading
//!
//! Built-in defaults, then `config.json`, then environment variables.
//! `COTHINK__SECTION__KEY` addresses any field; a few well-known variables
//! are accepted as aliases and lose to an explicit path variable.

use super::schema::Config;
use super::validate::validate_config;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_FILE: &str = "config.json";
const ENV_PREFIX: &str = "COTHINK__";
const ENV_ALIASES: &[(&str, &[&str])] = &[
    ("OPENROUTER_API_KEY", &["relay", "upstream", "api_key"]),
    ("COTHINK_RELAY_URL", &["chat", "relay_url"]),
];

/// Loads [`Config`] from a config directory and the environment
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Loader for `~/.cothink/config.json`
    pub fn new() -> Self {
        let dir = dirs::home_dir()
            .map(|home| home.join(".cothink"))
            .unwrap_or_else(|| PathBuf::from(".cothink"));
        Self::with_dir(dir)
    }

    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            config_path: dir.as_ref().join(CONFIG_FILE),
        }
    }

    /// Load using the process environment
    pub fn load(&self) -> crate::Result<Config> {
        self.load_with_env(std::env::vars())
    }

    /// Load using the given environment variables
    pub fn load_with_env<I>(&self, vars: I) -> crate::Result<Config>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut tree = serde_json::to_value(Config::default())?;
        if let Some(file) = self.read_file()? {
            merge(&mut tree, file);
        }
        for (path, value) in env_overrides(vars) {
            set_at(&mut tree, &path, value);
        }

        let config: Config = serde_json::from_value(tree)?;
        validate_config(&config)?;
        Ok(config)
    }

    fn read_file(&self) -> crate::Result<Option<Value>> {
        let content = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No config file at {}", self.config_path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content).map(Some).map_err(|e| {
            crate::Error::Config(format!("{}: {}", self.config_path.display(), e))
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Expand a leading `~` to the user's home directory
pub fn expand_tilde(path: &str) -> PathBuf {
    let rest = match path {
        "~" => "",
        _ => match path.strip_prefix("~/") {
            Some(rest) => rest,
            None => return PathBuf::from(path),
        },
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(path),
    }
}

/// Overrides in application order: aliases first, then prefixed paths
fn env_overrides<I>(vars: I) -> Vec<(Vec<String>, Value)>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut aliased = Vec::new();
    let mut explicit = Vec::new();

    for (key, raw) in vars {
        if let Some(suffix) = key.strip_prefix(ENV_PREFIX) {
            let path: Vec<String> = suffix
                .split("__")
                .filter(|segment| !segment.is_empty())
                .map(str::to_ascii_lowercase)
                .collect();
            if !path.is_empty() {
                explicit.push((path, parse_env_value(&raw)));
            }
        } else if let Some((_, path)) = ENV_ALIASES.iter().find(|(alias, _)| *alias == key) {
            let path = path.iter().map(ToString::to_string).collect();
            aliased.push((path, Value::String(raw)));
        }
    }

    aliased.extend(explicit);
    aliased
}

/// JSON literals keep their type, anything else is a string
fn parse_env_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (slot, value) => *slot = value,
    }
}

fn set_at(node: &mut Value, path: &[String], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        set_at(map.entry(head.clone()).or_insert(Value::Null), rest, value);
    }
}
