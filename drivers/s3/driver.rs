//! S3驱动核心实现
//!
//! - 只提供原语（put_object, get_object）
//! - 内存数据直接上传，流式数据交给 rust-s3 的分片上传
//! - 读取返回惰性字节流，不缓冲整个对象

use anyhow::{anyhow, Result as AnyResult};
use async_trait::async_trait;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::Region;

use crate::error::{Result, StorageError};
use crate::settings::ConnectionConfig;
use crate::storage::{ObjectDriver, ObjectMetadata, ObjectStream, UploadBody};

/// 用户自定义元数据前缀
const META_PREFIX: &str = "x-amz-meta-";

/// S3驱动
pub struct S3Driver {
    endpoint: String,
    region: Region,
    credentials: Credentials,
    path_style: bool,
}

impl S3Driver {
    /// 创建新的S3驱动实例
    pub fn new(config: &ConnectionConfig) -> AnyResult<Self> {
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| anyhow!("创建S3凭证失败: {}", e))?;

        let endpoint = config.endpoint_url();
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: endpoint.clone(),
        };

        let driver = Self {
            endpoint,
            region,
            credentials,
            path_style: config.path_style,
        };

        // 提前校验默认存储桶，配置错误立即失败
        driver.bucket(&config.bucket)?;

        Ok(driver)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 创建S3 Bucket客户端
    fn bucket(&self, name: &str) -> AnyResult<Box<Bucket>> {
        let bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())
            .map_err(|e| anyhow!("创建S3 Bucket失败: {}", e))?;

        let bucket = if self.path_style {
            bucket.with_path_style()
        } else {
            bucket
        };

        Ok(bucket)
    }

    /// 带元数据头的 Bucket（每次上传单独克隆，不污染共享状态）
    fn bucket_with_metadata(&self, name: &str, metadata: &ObjectMetadata) -> AnyResult<Box<Bucket>> {
        let mut bucket = self.bucket(name)?;

        let original_name = urlencoding::encode(&metadata.name);
        bucket.add_header(&format!("{}original-name", META_PREFIX), &original_name);

        for (key, value) in metadata_headers(metadata) {
            bucket.add_header(&key, &value);
        }

        Ok(bucket)
    }
}

/// 自定义元数据转换为请求头，跳过无法作为HTTP头的键值
fn metadata_headers(metadata: &ObjectMetadata) -> Vec<(String, String)> {
    metadata
        .extra
        .iter()
        .filter_map(|(key, value)| {
            let key = key.trim().to_ascii_lowercase();
            let valid_key = !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            let valid_value = value.chars().all(|c| c == ' ' || c.is_ascii_graphic());
            if valid_key && valid_value {
                Some((format!("{}{}", META_PREFIX, key), value.clone()))
            } else {
                tracing::warn!("Skipping object metadata that is not a valid header: {}", key);
                None
            }
        })
        .collect()
}

fn check_status(op: &str, bucket: &str, key: &str, code: u16) -> Result<()> {
    if (200..300).contains(&code) {
        Ok(())
    } else {
        Err(StorageError::backend(format!(
            "S3 {} /{}/{} 返回状态码 {}",
            op, bucket, key, code
        )))
    }
}

#[async_trait]
impl ObjectDriver for S3Driver {
    fn name(&self) -> &str {
        "S3"
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: UploadBody,
        metadata: &ObjectMetadata,
    ) -> Result<()> {
        let client = self
            .bucket_with_metadata(bucket, metadata)
            .map_err(StorageError::backend)?;
        let content_type = metadata.content_type();

        let code = match body {
            UploadBody::Bytes(data) => {
                tracing::debug!("S3上传: key={}, size={}", key, data.len());
                client
                    .put_object_with_content_type(key, &data, content_type)
                    .await
                    .map_err(StorageError::backend)?
                    .status_code()
            }
            UploadBody::Reader(mut reader) => {
                tracing::debug!("S3流式上传: key={}, declared_size={}", key, metadata.size);
                client
                    .put_object_stream_with_content_type(&mut reader, key, content_type)
                    .await
                    .map_err(StorageError::backend)?
                    .status_code()
            }
        };

        check_status("PutObject", bucket, key, code)
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectStream> {
        let client = self.bucket(bucket).map_err(StorageError::backend)?;

        let response = client
            .get_object_stream(key)
            .await
            .map_err(StorageError::backend)?;

        check_status("GetObject", bucket, key, response.status_code)?;

        Ok(ObjectStream::from_backend(response.bytes))
    }
}
