use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::api::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
}

/// GET /api/health - 健康检查
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthStatus>> {
    let config = state.adapter.current_config();
    Json(ApiResponse::success(HealthStatus {
        status: "ok",
        configured: config.is_some(),
        endpoint: config.as_ref().map(|c| c.endpoint_url()),
        bucket: config.map(|c| c.bucket),
    }))
}
