use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::AppConfig;
use super::validation::validate_config;
use crate::core::errors::ConfigError;

const REDACT_PLACEHOLDER: &str = "****";

const SENSITIVE_PATTERNS: [&str; 6] = [
    "api_key",
    "secret",
    "password",
    "_token",
    "credential",
    "private_key",
];

/// Environment variables that override a config path, with the expected value type.
const ENV_OVERRIDES: [(&str, &[&str], EnvKind); 8] = [
    ("GOOGLE_API_KEY", &["generation", "api_key"], EnvKind::Text),
    ("PORT", &["server", "port"], EnvKind::Integer),
    ("VIBE_HOST", &["server", "host"], EnvKind::Text),
    ("VIBE_EMBEDDINGS_PATH", &["retrieval", "embeddings_path"], EnvKind::Text),
    ("VIBE_METADATA_PATH", &["retrieval", "metadata_path"], EnvKind::Text),
    ("VIBE_TOP_K", &["retrieval", "top_k"], EnvKind::Integer),
    ("VIBE_EMBEDDING_URL", &["embedding", "base_url"], EnvKind::Text),
    ("VIBE_EMBEDDING_MODEL", &["embedding", "model"], EnvKind::Text),
];

#[derive(Debug, Clone, Copy)]
enum EnvKind {
    Text,
    Integer,
}

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    pub fn config_path(&self) -> PathBuf {
        if let Ok(path) = env::var("VIBE_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let user_config = self.paths.data_dir.join("config.yml");
        if user_config.exists() {
            return user_config;
        }

        self.paths.project_root.join("config.yml")
    }

    pub fn secrets_path(&self) -> PathBuf {
        self.paths.secrets_path.clone()
    }

    /// Loads `config.yml` merged with `secrets.yaml` and the process environment,
    /// then validates the result.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        self.load_with_env(|name| env::var(name).ok())
    }

    pub fn load_with_env<F>(&self, lookup: F) -> Result<AppConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut merged = self.load_raw()?;
        apply_env_overrides(&mut merged, lookup)?;
        let config: AppConfig = serde_json::from_value(merged).map_err(ConfigError::Schema)?;
        validate_config(&config)?;
        Ok(config)
    }

    pub fn load_raw(&self) -> Result<Value, ConfigError> {
        let public_config = load_yaml_file(&self.config_path())?;
        let secrets_config = load_yaml_file(&self.secrets_path())?;
        Ok(deep_merge(&public_config, &secrets_config))
    }

    pub fn redact_sensitive_values(&self, value: &Value) -> Value {
        redact_sensitive_values(value)
    }
}

fn load_yaml_file(path: &Path) -> Result<Value, ConfigError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    match value {
        Value::Object(_) => Ok(value),
        // an empty YAML document parses as null
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(ConfigError::Invalid {
            path: path.display().to_string(),
            message: "top level must be a mapping".to_string(),
        }),
    }
}

fn apply_env_overrides<F>(config: &mut Value, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    for (name, path, kind) in ENV_OVERRIDES {
        let Some(raw) = lookup(name) else {
            continue;
        };
        let raw = raw.trim().to_string();
        if raw.is_empty() {
            continue;
        }

        let value = match kind {
            EnvKind::Text => Value::String(raw),
            EnvKind::Integer => match raw.parse::<u64>() {
                Ok(number) => Value::from(number),
                Err(_) => return Err(ConfigError::Env { name, value: raw }),
            },
        };
        ensure_object_path(config, path, value);
    }
    Ok(())
}

fn ensure_object_path(config: &mut Value, path: &[&str], value: Value) {
    if path.is_empty() {
        return;
    }

    let mut current = config;
    for (index, key) in path.iter().enumerate() {
        if index == path.len() - 1 {
            if let Some(map) = current.as_object_mut() {
                map.insert(key.to_string(), value);
            }
            return;
        }

        if !current.get(*key).map(|v| v.is_object()).unwrap_or(false) {
            let Some(map) = current.as_object_mut() else {
                return;
            };
            map.insert((*key).to_string(), Value::Object(Map::new()));
        }

        let Some(next) = current.get_mut(*key) else {
            return;
        };
        current = next;
    }
}

fn deep_merge(base: &Value, override_value: &Value) -> Value {
    match (base, override_value) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged: Map<String, Value> = base_map.clone();
            for (key, value) in override_map {
                let merged_value = match merged.get(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), merged_value);
            }
            Value::Object(merged)
        }
        _ => override_value.clone(),
    }
}

fn redact_sensitive_values(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut redacted = Map::new();
            for (key, item) in map {
                let new_value = if is_sensitive_key(key) && !item.is_null() {
                    Value::String(REDACT_PLACEHOLDER.to_string())
                } else {
                    redact_sensitive_values(item)
                };
                redacted.insert(key.clone(), new_value);
            }
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.iter().map(redact_sensitive_values).collect()),
        _ => value.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}
