use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

use minio_storage::{Attachment, ObjectMetadata, Payload, StorageError, UploadedFile};

use crate::api::{error_response, ApiResponse};
use crate::state::AppState;

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error(StatusCode::BAD_REQUEST, message)),
    )
        .into_response()
}

/// 最大内存缓冲大小（超过此大小写入临时文件）
const MAX_MEMORY_UPLOAD_SIZE: usize = 32 * 1024 * 1024; // 32MB

/// Multipart field kept in memory until it outgrows the limit, then spilled
/// to a temp file / 上传缓冲：超出限制后写入临时文件
struct SpooledField {
    limit: usize,
    memory: Vec<u8>,
    disk: Option<(tokio::fs::File, TempPath)>,
    size: u64,
}

impl SpooledField {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            memory: Vec::new(),
            disk: None,
            size: 0,
        }
    }

    async fn push(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        self.size += chunk.len() as u64;

        if self.disk.is_none() && self.memory.len() + chunk.len() <= self.limit {
            self.memory.extend_from_slice(chunk);
            return Ok(());
        }

        if self.disk.is_none() {
            let (file, path) = tempfile::NamedTempFile::new()?.into_parts();
            let mut file = tokio::fs::File::from_std(file);
            file.write_all(&self.memory).await?;
            self.memory = Vec::new();
            tracing::debug!("Upload exceeds {} bytes, spilling to {:?}", self.limit, path);
            self.disk = Some((file, path));
        }

        if let Some((file, _)) = self.disk.as_mut() {
            file.write_all(chunk).await?;
        }
        Ok(())
    }

    /// The payload plus the temp file guard, which must outlive the upload / 返回上传数据和临时文件
    async fn finish(self, name: &str) -> std::io::Result<(Payload, Option<TempPath>)> {
        match self.disk {
            Some((mut file, path)) => {
                file.flush().await?;
                drop(file);
                let descriptor = UploadedFile::from_path(path.to_path_buf()).with_name(name);
                Ok((Payload::File(descriptor), Some(path)))
            }
            None => {
                let descriptor = UploadedFile::from_buffer(self.memory).with_name(name);
                Ok((Payload::File(descriptor), None))
            }
        }
    }
}

/// POST /api/attachments - 上传附件（multipart 字段 file）
pub async fn upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    let mut file: Option<(String, Option<String>, SpooledField)> = None;

    loop {
        let mut field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return bad_request(&e.to_string()),
        };
        if field.name() != Some("file") || file.is_some() {
            continue;
        }

        let name = field.file_name().unwrap_or("unknown").to_string();
        let content_type = field.content_type().map(|c| c.to_string());
        let mut spool = SpooledField::new(MAX_MEMORY_UPLOAD_SIZE);
        loop {
            match field.chunk().await {
                Ok(Some(chunk)) => {
                    if let Err(e) = spool.push(&chunk).await {
                        return error_response(StorageError::Io(e));
                    }
                }
                Ok(None) => break,
                Err(e) => return bad_request(&e.to_string()),
            }
        }
        file = Some((name, content_type, spool));
    }

    let Some((name, content_type, spool)) = file else {
        return bad_request("missing multipart field: file");
    };

    let size = spool.size;
    let metadata = match content_type {
        Some(ct) => ObjectMetadata::new(&name, size, &ct),
        None => ObjectMetadata::guessed(&name, size),
    };
    // 临时文件在上传完成后才删除
    let (payload, _spill) = match spool.finish(&name).await {
        Ok(finished) => finished,
        Err(e) => return error_response(StorageError::Io(e)),
    };

    match state.adapter.store(payload, metadata).await {
        Ok(stored) => {
            tracing::info!("Attachment stored: {} -> {}", stored.metadata.name, stored.location);
            Json(ApiResponse::success(stored)).into_response()
        }
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
    pub size: u64,
}

/// GET /api/attachments/:bucket/:key - 下载附件（流式）
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path((bucket, key)): Path<(String, String)>,
    Query(query): Query<DownloadQuery>,
) -> Response {
    let name = query.name.unwrap_or_else(|| key.clone());
    let mime_type = query.mime_type.unwrap_or_else(|| {
        mime_guess::from_path(&name).first_or_octet_stream().to_string()
    });

    let attachment = Attachment {
        location: format!("/{}/{}", bucket, key),
        name,
        size: query.size,
        mime_type,
    };

    match state.adapter.download(&attachment).await {
        Ok(object) => object.into_response(),
        Err(e) => error_response(e),
    }
}
