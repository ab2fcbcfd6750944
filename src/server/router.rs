use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::config::defaults::default_cors_origins;
use crate::server::handlers::{health, recommend};
use crate::state::AppState;

/// Creates the application router: `/health`, `/recommend`, CORS and request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.config.server.cors_allowed_origins);
    Router::new()
        .route("/health", get(health::health))
        .route("/recommend", get(recommend::recommend))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(configured: &[String]) -> CorsLayer {
    let allowed_origins = resolve_allowed_origins(configured)
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(&origin).ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(configured: &[String]) -> Vec<String> {
    let origins = configured
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return default_cors_origins();
    }
    origins
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_origin_list_falls_back_to_local_defaults() {
        assert_eq!(resolve_allowed_origins(&[]), default_cors_origins());
        assert_eq!(
            resolve_allowed_origins(&[" ".to_string()]),
            default_cors_origins()
        );
    }

    #[test]
    fn configured_origins_are_trimmed() {
        let origins = resolve_allowed_origins(&[" https://vibe.example ".to_string()]);
        assert_eq!(origins, vec!["https://vibe.example".to_string()]);
    }
}
