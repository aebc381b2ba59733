use async_trait::async_trait;
use bytes::Bytes;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::io::AsyncRead;

use crate::error::{Result, StorageError};
use crate::settings::ConnectionConfig;

pub mod adapter;
pub mod location;
pub mod payload;
pub mod stream;

pub use adapter::ObjectStoreAdapter;
pub use location::ObjectLocation;
pub use payload::{Payload, PayloadSender, UploadedFile};
pub use stream::{content_disposition, ObjectStream, StreamableObject};

/// Metadata supplied by the host when storing an object / 上传时的对象元数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Human readable file name, used to derive the object key / 原始文件名
    pub name: String,
    /// Exact byte length of the payload / 字节长度
    pub size: u64,
    /// MIME type / 文件类型
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Extra object metadata (sent as `x-amz-meta-*`) / 额外元数据
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl ObjectMetadata {
    pub fn new(name: &str, size: u64, mime_type: &str) -> Self {
        Self {
            name: name.to_string(),
            size,
            mime_type: mime_type.to_string(),
            extra: BTreeMap::new(),
        }
    }

    /// Guess the MIME type from the file name / 根据文件名推断类型
    pub fn guessed(name: &str, size: u64) -> Self {
        let mime = mime_guess::from_path(name).first_or_octet_stream();
        Self::new(name, size, mime.as_ref())
    }

    pub fn with_extra(mut self, key: &str, value: &str) -> Self {
        self.extra.insert(key.to_string(), value.to_string());
        self
    }

    /// Content type to send to the backend / 发送给后端的内容类型
    pub fn content_type(&self) -> &str {
        if self.mime_type.is_empty() {
            "application/octet-stream"
        } else {
            &self.mime_type
        }
    }
}

/// Host-owned attachment record, only read by the adapter / 宿主的附件记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub location: String,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
}

impl Attachment {
    /// Parse the location into bucket and key / 解析位置
    pub fn object_location(&self) -> Result<ObjectLocation> {
        ObjectLocation::parse(&self.location)
    }
}

/// Result of `store`: the metadata plus the new location / 上传结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAttachment {
    #[serde(flatten)]
    pub metadata: ObjectMetadata,
    pub location: ObjectLocation,
}

impl StoredAttachment {
    /// Turn into the reference the host keeps for later reads / 转换为附件记录
    pub fn to_attachment(&self) -> Attachment {
        Attachment {
            location: self.location.to_string(),
            name: self.metadata.name.clone(),
            size: self.metadata.size,
            mime_type: self.metadata.mime_type.clone(),
        }
    }
}

/// Normalized upload body handed to a driver / 统一的上传数据
pub enum UploadBody {
    /// Whole object in memory / 内存数据
    Bytes(Bytes),
    /// Pull-style reader, consumed once / 流式读取器
    Reader(Box<dyn AsyncRead + Send + Unpin>),
}

impl std::fmt::Debug for UploadBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadBody::Bytes(b) => f.debug_tuple("Bytes").field(&b.len()).finish(),
            UploadBody::Reader(_) => f.write_str("Reader"),
        }
    }
}

/// Object-store driver interface (primitive operations only) / 对象存储驱动接口
#[async_trait]
pub trait ObjectDriver: Send + Sync {
    /// Driver name / 驱动名称
    fn name(&self) -> &str;

    /// Upload one object / 上传对象
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: UploadBody,
        metadata: &ObjectMetadata,
    ) -> Result<()>;

    /// Open a lazy read stream for one object / 打开对象读取流
    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectStream>;
}

pub type DriverBox = Arc<dyn ObjectDriver>;

/// Driver factory trait / 驱动工厂 trait
pub trait DriverFactory: Send + Sync {
    /// Driver type name / 驱动类型名称
    fn driver_type(&self) -> &'static str;

    /// Build a driver from a validated configuration / 创建驱动实例
    fn create_driver(&self, config: &ConnectionConfig) -> anyhow::Result<DriverBox>;
}

/// Process-wide adapter / 全局适配器实例
static ADAPTER: OnceCell<Arc<ObjectStoreAdapter>> = OnceCell::new();

/// Install the process-wide adapter (once) / 初始化全局适配器
pub fn init_global(adapter: ObjectStoreAdapter) -> Result<Arc<ObjectStoreAdapter>> {
    let adapter = Arc::new(adapter);
    ADAPTER
        .set(adapter.clone())
        .map_err(|_| StorageError::Configuration("Adapter already initialized".to_string()))?;
    Ok(adapter)
}

/// Get the process-wide adapter / 获取全局适配器
pub fn global() -> Option<Arc<ObjectStoreAdapter>> {
    ADAPTER.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_guessed_type() {
        assert_eq!(ObjectMetadata::guessed("a.png", 3).mime_type, "image/png");
        assert_eq!(
            ObjectMetadata::guessed("blob", 3).mime_type,
            "application/octet-stream"
        );
        assert_eq!(
            ObjectMetadata::new("a", 0, "").content_type(),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_stored_attachment_json() {
        let stored = StoredAttachment {
            metadata: ObjectMetadata::new("a.png", 3, "image/png"),
            location: ObjectLocation::new("bucket", "a-1.png").unwrap(),
        };
        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["name"], "a.png");
        assert_eq!(json["type"], "image/png");
        assert_eq!(json["location"], "/bucket/a-1.png");

        let attachment = stored.to_attachment();
        assert_eq!(attachment.location, "/bucket/a-1.png");
        assert_eq!(attachment.size, 3);
    }

    #[test]
    fn test_global_adapter_set_once() {
        let factory = Arc::new(crate::drivers::memory::MemoryDriverFactory::new());
        let first = init_global(ObjectStoreAdapter::new(factory.clone())).unwrap();
        assert!(Arc::ptr_eq(&first, &global().unwrap()));
        assert!(matches!(
            init_global(ObjectStoreAdapter::new(factory)),
            Err(StorageError::Configuration(_))
        ));
    }
}
