pub mod attachments;
pub mod server;
pub mod settings;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use minio_storage::StorageError;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: StatusCode, message: &str) -> Self {
        Self {
            code: code.as_u16() as i32,
            message: message.to_string(),
            data: None,
        }
    }
}

/// Map a storage error to an HTTP status / 存储错误对应的状态码
pub fn status_for(err: &StorageError) -> StatusCode {
    match err {
        StorageError::MalformedLocation(_) | StorageError::UnsupportedPayloadType(_) => {
            StatusCode::BAD_REQUEST
        }
        StorageError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
        StorageError::Backend(_) => StatusCode::BAD_GATEWAY,
        StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON error response for a storage error / 存储错误的JSON响应
pub fn error_response(err: StorageError) -> Response {
    let status = status_for(&err);
    tracing::warn!("Storage request failed: {}", err);
    (status, Json(ApiResponse::<()>::error(status, &err.to_string()))).into_response()
}
