//! Route definitions

use super::handlers;
use super::state::AppState;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        tracing::info_span!(
            "request",
            id = %Uuid::new_v4(),
            method = %request.method(),
            uri = %request.uri(),
        )
    });

    let timeout = TimeoutLayer::new(Duration::from_secs_f64(
        state.settings.server.request_timeout,
    ));

    Router::new()
        // API routes
        .route("/transactions", get(handlers::transactions))
        .route("/health", get(handlers::health))
        .route("/stats", get(handlers::stats))
        .fallback(handlers::not_found)
        // Add middleware
        .layer(timeout)
        .layer(middleware::map_response(timeout_body))
        .layer(cors)
        .layer(trace)
        // Add state
        .with_state(state)
}

/// `TimeoutLayer` answers with an empty 408; give it the usual error body
async fn timeout_body(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        let body = Json(serde_json::json!({ "error": "request timed out" }));
        return (StatusCode::REQUEST_TIMEOUT, body).into_response();
    }
    response
}
