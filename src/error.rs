//! Storage error taxonomy / 存储错误类型
//!
//! Every failure reaches the caller as one of these variants. The adapter
//! never logs-and-swallows an error itself.

use thiserror::Error;

/// Boxed error coming from the object-store client / 后端错误
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum StorageError {
    /// Malformed or missing connection settings / 连接配置错误
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Payload shape the adapter cannot upload / 不支持的上传数据类型
    #[error("Unsupported payload type: {0}")]
    UnsupportedPayloadType(String),

    /// Location is not `/<bucket>/<key>` / 位置格式错误
    #[error("Malformed location: {0:?}")]
    MalformedLocation(String),

    /// Transport or protocol failure reported by the backend / 后端错误
    #[error("Storage backend error: {0}")]
    Backend(#[source] BackendError),

    /// Local file access (uploaded file descriptors with a path) / 本地IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Wrap any backend failure verbatim / 包装后端错误
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<BackendError>,
    {
        StorageError::Backend(err.into())
    }

    pub fn is_backend(&self) -> bool {
        matches!(self, StorageError::Backend(_))
    }
}

impl serde::Serialize for StorageError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
