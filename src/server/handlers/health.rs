use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "places": state.store.len(),
        "dimension": state.store.dimension(),
        "top_k": state.recommender.retriever().top_k(),
        "uptime_secs": state.uptime_secs(),
    }))
}
