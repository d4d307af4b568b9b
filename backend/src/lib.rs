//! tvhub backend library.
//!
//! This module exposes the application builder for use in tests.

use axum::http::{header, HeaderValue, Method};
use axum::{routing::get, Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

pub mod api;
pub mod config;
pub mod environment;
pub mod openapi;
pub mod release;
pub mod state;
pub mod version;

use config::Config;
use state::AppState;

/// Create the Axum application router from configuration.
///
/// This function is used by the main server binary.
pub fn create_app(config: &Config) -> anyhow::Result<Router> {
    let state = AppState::from_config(config)?;
    Ok(create_app_with_config(
        state,
        config.cors_allowed_origins.clone(),
    ))
}

/// Create the Axum application router with a given state, allowing any origin.
pub fn create_app_with_state(state: AppState) -> Router {
    create_app_with_config(state, Vec::new())
}

/// Create the Axum application router with a given state and CORS origins.
///
/// If `cors_allowed_origins` is empty, any origin is allowed.
/// Otherwise, only the specified origins are allowed.
pub fn create_app_with_config(state: AppState, cors_allowed_origins: Vec<String>) -> Router {
    let api_router = Router::new().route("/version", get(api::version::get_version));

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let cors = if cors_allowed_origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = cors_allowed_origins
            .iter()
            .filter_map(|o| o.parse::<HeaderValue>().ok())
            .collect();
        cors.allow_origin(origins)
    };

    Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api", api_router)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "OK"
}

/// Serve the OpenAPI document.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi::ApiDoc::openapi())
}
