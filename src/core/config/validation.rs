use super::settings::AppConfig;
use crate::core::errors::ConfigError;

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_non_empty("server.host", &config.server.host)?;
    for (idx, origin) in config.server.cors_allowed_origins.iter().enumerate() {
        validate_non_empty(&format!("server.cors_allowed_origins[{}]", idx), origin)?;
    }

    validate_non_empty("retrieval.embeddings_path", &config.retrieval.embeddings_path)?;
    validate_non_empty("retrieval.metadata_path", &config.retrieval.metadata_path)?;
    validate_range("retrieval.top_k", config.retrieval.top_k as u64, 1, 100)?;

    validate_non_empty("embedding.model", &config.embedding.model)?;
    validate_http_url("embedding.base_url", &config.embedding.base_url)?;

    validate_non_empty("generation.model", &config.generation.model)?;
    if let Some(base_url) = &config.generation.base_url {
        validate_http_url("generation.base_url", base_url)?;
    }
    match config.generation.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => {}
        _ => {
            return Err(ConfigError::Invalid {
                path: "generation.api_key".to_string(),
                message: "value is required (set GOOGLE_API_KEY or secrets.yaml)".to_string(),
            })
        }
    }

    validate_range("request.timeout_secs", config.request.timeout_secs, 1, 3_600)?;
    validate_range(
        "request.max_query_chars",
        config.request.max_query_chars as u64,
        1,
        100_000,
    )?;

    Ok(())
}

fn validate_non_empty(path: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid {
            path: path.to_string(),
            message: "must not be empty".to_string(),
        });
    }
    Ok(())
}

fn validate_range(path: &str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid {
            path: path.to_string(),
            message: format!("must be between {} and {}", min, max),
        });
    }
    Ok(())
}

fn validate_http_url(path: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        return Ok(());
    }
    Err(ConfigError::Invalid {
        path: path.to_string(),
        message: "must be an http(s) URL".to_string(),
    })
}
