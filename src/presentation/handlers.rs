// HTTP request handlers
use crate::infrastructure::chunked_json::stream_from_receiver;
use crate::infrastructure::http_response::json_response;
use crate::presentation::app_state::AppState;
use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

/// Check if client accepts Brotli compression
fn accepts_brotli(headers: &HeaderMap) -> bool {
    headers
        .get("accept-encoding")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.contains("br"))
        .unwrap_or(false)
}

async fn respond<T: Serialize>(data: &T, headers: &HeaderMap) -> Response {
    match json_response(data, accepts_brotli(headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current reading, unit and state label
pub async fn current_state(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    respond(&state.dashboard_service.reading(), &headers).await
}

/// Lifetime ON/OFF counters for the proportion view
pub async fn duty_cycle(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    respond(&state.dashboard_service.duty_cycle(), &headers).await
}

/// Retained timeline segments with annotation placements
pub async fn timeline(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    respond(&state.dashboard_service.timeline(), &headers).await
}

/// Full dashboard view
pub async fn dashboard(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    respond(&state.dashboard_service.dashboard(), &headers).await
}

/// Stream dashboard frames at the refresh cadence
pub async fn stream_dashboard(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let rx = state.streaming_service.stream_dashboard();
    stream_from_receiver(rx, accepts_brotli(&headers)).await
}
