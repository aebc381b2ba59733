use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use minio_storage::config;
use minio_storage::MinioSettings;

use crate::api::{error_response, ApiResponse};
use crate::state::AppState;

/// PUT /api/settings - 更新 MinIO 配置并重建客户端
/// Settings change: validate, swap the client, then persist
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<MinioSettings>,
) -> Response {
    if let Err(e) = state.adapter.apply_settings(&settings) {
        return error_response(e);
    }

    if let Err(e) = config::update_minio_settings(settings) {
        tracing::error!("Failed to persist settings: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<()>::error(StatusCode::INTERNAL_SERVER_ERROR, &e)),
        )
            .into_response();
    }

    Json(ApiResponse::success(())).into_response()
}
