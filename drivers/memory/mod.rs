//! 内存驱动
//!
//! Keeps objects in process memory. Used as the fake backend in tests and by
//! hosts that want storage without a network. Counts every call so callers
//! can check that local validation failures never reach the backend.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::AsyncReadExt;

use crate::error::{Result, StorageError};
use crate::settings::ConnectionConfig;
use crate::storage::{DriverBox, DriverFactory, ObjectDriver, ObjectMetadata, ObjectStream, UploadBody};

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// One stored object / 存储的对象
#[derive(Debug, Clone)]
pub struct MemoryObject {
    pub data: Bytes,
    pub content_type: String,
    pub extra: BTreeMap<String, String>,
}

/// One-shot fault for the next `get_object` / 下一次读取的故障注入
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadFault {
    /// Fail while opening the stream / 打开失败
    Open,
    /// Emit N chunks then an error / 传输N块后出错
    AfterChunks(usize),
}

pub struct MemoryDriver {
    endpoint: String,
    objects: RwLock<HashMap<(String, String), MemoryObject>>,
    chunk_size: AtomicUsize,
    fault: Mutex<Option<ReadFault>>,
    puts: AtomicUsize,
    gets: AtomicUsize,
}

impl MemoryDriver {
    pub fn new(config: &ConnectionConfig) -> Self {
        Self {
            endpoint: config.endpoint_url(),
            objects: RwLock::new(HashMap::new()),
            chunk_size: AtomicUsize::new(DEFAULT_CHUNK_SIZE),
            fault: Mutex::new(None),
            puts: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<MemoryObject> {
        self.objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Chunk size of read streams / 读取分块大小
    pub fn set_chunk_size(&self, size: usize) {
        self.chunk_size.store(size.max(1), Ordering::SeqCst);
    }

    pub fn inject_read_fault(&self, fault: ReadFault) {
        *self.fault.lock() = Some(fault);
    }
}

#[async_trait]
impl ObjectDriver for MemoryDriver {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: UploadBody,
        metadata: &ObjectMetadata,
    ) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);

        let data = match body {
            UploadBody::Bytes(bytes) => bytes,
            UploadBody::Reader(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).await.map_err(StorageError::backend)?;
                Bytes::from(buf)
            }
        };

        // 和S3一样，声明的大小必须与实际数据一致
        if data.len() as u64 != metadata.size {
            return Err(StorageError::backend(format!(
                "declared size {} does not match {} bytes received",
                metadata.size,
                data.len()
            )));
        }

        self.objects.write().insert(
            (bucket.to_string(), key.to_string()),
            MemoryObject {
                data,
                content_type: metadata.content_type().to_string(),
                extra: metadata.extra.clone(),
            },
        );
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectStream> {
        self.gets.fetch_add(1, Ordering::SeqCst);

        let fault = self.fault.lock().take();
        if fault == Some(ReadFault::Open) {
            return Err(StorageError::backend("injected open fault"));
        }

        let object = self
            .object(bucket, key)
            .ok_or_else(|| StorageError::backend(format!("object not found: /{}/{}", bucket, key)))?;

        let chunk_size = self.chunk_size.load(Ordering::SeqCst);
        let mut chunks: Vec<io::Result<Vec<u8>>> =
            object.data.chunks(chunk_size).map(|c| Ok(c.to_vec())).collect();

        if let Some(ReadFault::AfterChunks(n)) = fault {
            chunks.truncate(n);
            chunks.push(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "injected read fault",
            )));
        }

        Ok(ObjectStream::from_backend(futures::stream::iter(chunks)))
    }
}

/// Memory driver factory / 内存驱动工厂
///
/// Remembers every driver it built, in order.
#[derive(Default)]
pub struct MemoryDriverFactory {
    drivers: Mutex<Vec<Arc<MemoryDriver>>>,
    fail_next: Mutex<Option<String>>,
}

impl MemoryDriverFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver built by the n-th successful `create_driver` / 第n个驱动
    pub fn driver(&self, index: usize) -> Option<Arc<MemoryDriver>> {
        self.drivers.lock().get(index).cloned()
    }

    pub fn created(&self) -> usize {
        self.drivers.lock().len()
    }

    /// Make the next `create_driver` fail / 让下一次创建失败
    pub fn fail_next_create(&self, message: &str) {
        *self.fail_next.lock() = Some(message.to_string());
    }
}

impl DriverFactory for MemoryDriverFactory {
    fn driver_type(&self) -> &'static str {
        "memory"
    }

    fn create_driver(&self, config: &ConnectionConfig) -> anyhow::Result<DriverBox> {
        if let Some(message) = self.fail_next.lock().take() {
            return Err(anyhow::anyhow!(message));
        }
        let driver = Arc::new(MemoryDriver::new(config));
        self.drivers.lock().push(driver.clone());
        Ok(driver)
    }
}
