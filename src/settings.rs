//! MinIO helper settings / MinIO 配置
//!
//! `MinioSettings` holds values as the host's settings store keeps them
//! (port as text, secrets possibly empty). `validate` turns them into a
//! `ConnectionConfig`, the only form a driver accepts.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};

/// Env var overriding the default bucket / 默认存储桶环境变量
pub const DEFAULT_BUCKET_ENV: &str = "MINIO_DEFAULT_BUCKET_NAME";

/// Bucket used when the env var is unset or blank / 默认存储桶
pub const FALLBACK_BUCKET: &str = "hexabot";

/// Raw settings group / 原始配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinioSettings {
    /// Host name of the object store / 端点地址
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Port, kept as text like the host settings UI / 端口
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default)]
    pub use_ssl: bool,
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    /// Default bucket for new objects / 默认存储桶
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// 区域
    #[serde(default = "default_region")]
    pub region: String,
    /// 强制使用路径风格（MinIO需要）
    #[serde(default = "default_path_style")]
    pub path_style: bool,
}

fn default_endpoint() -> String {
    "minio".to_string()
}

fn default_port() -> String {
    "9000".to_string()
}

fn default_bucket() -> String {
    bucket_or_fallback(std::env::var(DEFAULT_BUCKET_ENV).ok())
}

fn bucket_or_fallback(value: Option<String>) -> String {
    value
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_BUCKET.to_string())
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_path_style() -> bool {
    true
}

impl Default for MinioSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            port: default_port(),
            use_ssl: false,
            access_key: String::new(),
            secret_key: String::new(),
            bucket: default_bucket(),
            region: default_region(),
            path_style: default_path_style(),
        }
    }
}

/// Validated connection configuration / 校验后的连接配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub endpoint: String,
    pub port: u16,
    pub use_ssl: bool,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
    pub path_style: bool,
}

impl ConnectionConfig {
    /// Endpoint URL, e.g. `http://minio:9000` / 端点URL
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.endpoint, self.port)
    }
}

impl MinioSettings {
    /// Validate into a connection config; fails fast on missing fields / 校验配置
    pub fn validate(&self) -> Result<ConnectionConfig> {
        let endpoint = required("endpoint", &self.endpoint)?;
        if endpoint.contains("://") || endpoint.contains('/') {
            return Err(StorageError::Configuration(format!(
                "endpoint must be a host name without scheme or path: {}",
                endpoint
            )));
        }

        let port = self.port.trim().parse::<u16>().map_err(|_| {
            StorageError::Configuration(format!("port is not a valid port number: {:?}", self.port))
        })?;

        let bucket = required("bucket", &self.bucket)?;
        if bucket.contains('/') {
            return Err(StorageError::Configuration(format!(
                "bucket name must not contain '/': {}",
                bucket
            )));
        }

        Ok(ConnectionConfig {
            endpoint,
            port,
            use_ssl: self.use_ssl,
            access_key: required("access_key", &self.access_key)?,
            secret_key: required("secret_key", &self.secret_key)?,
            bucket,
            region: if self.region.trim().is_empty() {
                default_region()
            } else {
                self.region.trim().to_string()
            },
            path_style: self.path_style,
        })
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StorageError::Configuration(format!("{} is required", field)));
    }
    Ok(value.to_string())
}
