use std::path::PathBuf;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::vector_math::NormalizeError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("upstream failure during {stage}: {message}")]
    BadGateway { stage: &'static str, message: String },
    #[error("timed out during {stage}")]
    GatewayTimeout { stage: &'static str },
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::BadGateway { stage, message } => (
                StatusCode::BAD_GATEWAY,
                json!({ "error": message, "stage": stage }),
            ),
            ApiError::GatewayTimeout { stage } => (
                StatusCode::GATEWAY_TIMEOUT,
                json!({ "error": "Request timed out", "stage": stage }),
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": msg }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config structure: {0}")]
    Schema(#[source] serde_json::Error),

    #[error("environment variable {name} has invalid value {value:?}")]
    Env { name: &'static str, value: String },

    #[error("Invalid config at '{path}': {message}")]
    Invalid { path: String, message: String },
}

/// Failure to bring the embedding store up. Always fatal at startup.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{kind} file not found: {}", path.display())]
    Missing { kind: &'static str, path: PathBuf },

    #[error("failed to read {kind} file {}: {source}", path.display())]
    Io {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed embeddings file {}: {reason}", path.display())]
    MalformedEmbeddings { path: PathBuf, reason: String },

    #[error("malformed metadata file {}: {source}", path.display())]
    MalformedMetadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("embedding count {vectors} does not match metadata count {records}")]
    CountMismatch { vectors: usize, records: usize },

    #[error("embedding row {row} has dimension {found}, expected {expected}")]
    RaggedVectors {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("embedding row {row} cannot be normalized: {source}")]
    InvalidVector {
        row: usize,
        #[source]
        source: NormalizeError,
    },

    #[error("embeddings must have a non-zero dimension")]
    ZeroDimension,
}

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("embedding request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("embedding service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),

    #[error("expected exactly one query vector, got {0}")]
    UnexpectedCount(usize),

    #[error("query vector cannot be normalized: {0}")]
    InvalidVector(#[source] NormalizeError),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query dimension {found} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("search returned position {position} outside store of size {size}")]
    PositionOutOfRange { position: usize, size: usize },
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation request rejected: invalid or missing credentials ({status})")]
    Authentication { status: u16 },

    #[error("generation quota exhausted: {body}")]
    Quota { body: String },

    #[error("generation request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("generation service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed generation response: {0}")]
    MalformedResponse(String),
}
