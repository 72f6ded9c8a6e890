//! HTTP request handlers

use super::state::AppState;
use crate::error::QueryError;
use crate::query::TransactionParams;
use crate::results::TransactionRecord;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Transactions handler: `GET /transactions`
pub async fn transactions(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<TransactionRecord>>, QueryError> {
    let params = TransactionParams::from_pairs(pairs);
    let records = state.service.query(&params).await?;
    Ok(Json(records))
}

/// Health check handler
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let backend = state.service.backend_kind();
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "instance": state.instance_name(),
        "backend": backend.as_str(),
        "engine": backend.engine(),
    }))
}

/// Stats handler
pub async fn stats(State(state): State<AppState>) -> Response {
    if !state.metrics_enabled() {
        return not_found().await.into_response();
    }
    Json(state.service.metrics().snapshot()).into_response()
}

/// Fallback for unknown routes
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "not found" })),
    )
}
