use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::core::errors::ApiError;
use crate::recommend::{Recommendation, RecommendError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecommendParams {
    pub q: Option<String>,
}

pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecommendParams>,
) -> Result<Json<Recommendation>, ApiError> {
    let query = validate_query(params.q.as_deref(), state.config.request.max_query_chars)?;
    let recommendation = state
        .recommender
        .recommend(query)
        .await
        .map_err(to_api_error)?;
    Ok(Json(recommendation))
}

fn validate_query(raw: Option<&str>, max_chars: usize) -> Result<&str, ApiError> {
    let query = raw.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "query parameter 'q' is required".to_string(),
        ));
    }
    if query.chars().count() > max_chars {
        return Err(ApiError::BadRequest(format!(
            "query parameter 'q' must be at most {} characters",
            max_chars
        )));
    }
    Ok(query)
}

fn to_api_error(err: RecommendError) -> ApiError {
    let stage = err.stage().as_str();
    match err {
        RecommendError::Encoding(_) | RecommendError::Generation(_) => ApiError::BadGateway {
            stage,
            message: err.to_string(),
        },
        RecommendError::Search { .. } => ApiError::internal(err),
        RecommendError::Timeout { .. } => ApiError::GatewayTimeout { stage },
    }
}
