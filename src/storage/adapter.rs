use parking_lot::RwLock;
use std::sync::Arc;

use super::{
    content_disposition, Attachment, DriverBox, DriverFactory, ObjectLocation, ObjectMetadata,
    ObjectStream, Payload, StoredAttachment, StreamableObject,
};
use crate::error::{Result, StorageError};
use crate::settings::{ConnectionConfig, MinioSettings};
use crate::utils::unique_object_name;

/// A driver together with the config it was built from / 驱动及其配置
///
/// Swapped as one unit, so an operation never sees a new bucket with an old
/// endpoint or the other way round.
pub struct ActiveDriver {
    pub config: ConnectionConfig,
    pub driver: DriverBox,
}

/// Object-store adapter (upload/download contract over one driver) / 对象存储适配器
///
/// Every operation captures the active driver once at call start and keeps it
/// until it completes; `configure` only affects operations started after it
/// returns.
pub struct ObjectStoreAdapter {
    factory: Arc<dyn DriverFactory>,
    active: RwLock<Option<Arc<ActiveDriver>>>,
}

impl ObjectStoreAdapter {
    pub fn new(factory: Arc<dyn DriverFactory>) -> Self {
        Self {
            factory,
            active: RwLock::new(None),
        }
    }

    /// (Re)build the driver and swap it in / 重新创建驱动并替换
    ///
    /// On failure the previous driver stays active.
    pub fn configure(&self, config: ConnectionConfig) -> Result<()> {
        let driver = self
            .factory
            .create_driver(&config)
            .map_err(|e| StorageError::Configuration(format!("{:#}", e)))?;

        tracing::info!(
            "Object store driver configured: {} ({}, bucket={})",
            self.factory.driver_type(),
            config.endpoint_url(),
            config.bucket
        );

        let next = Arc::new(ActiveDriver { config, driver });
        *self.active.write() = Some(next);
        Ok(())
    }

    /// Validate raw settings then reconfigure (bootstrap and settings updates) / 应用配置
    pub fn apply_settings(&self, settings: &MinioSettings) -> Result<()> {
        let config = settings.validate()?;
        self.configure(config)
    }

    pub fn is_configured(&self) -> bool {
        self.active.read().is_some()
    }

    /// Snapshot of the active configuration / 当前配置快照
    pub fn current_config(&self) -> Option<ConnectionConfig> {
        self.active.read().as_ref().map(|a| a.config.clone())
    }

    fn active(&self) -> Result<Arc<ActiveDriver>> {
        self.active
            .read()
            .clone()
            .ok_or_else(|| StorageError::Configuration("object store is not configured".to_string()))
    }

    /// Store a payload under a fresh unique key in the default bucket / 存储附件
    pub async fn store(&self, payload: Payload, metadata: ObjectMetadata) -> Result<StoredAttachment> {
        let active = self.active()?;
        let kind = payload.kind();
        let body = payload.into_body().await?;

        let key = unique_object_name(&metadata.name);
        let location = ObjectLocation::new(active.config.bucket.as_str(), key.as_str())?;

        tracing::debug!(
            "Storing {} payload: name={}, size={}, location={}",
            kind,
            metadata.name,
            metadata.size,
            location
        );

        active
            .driver
            .put_object(location.bucket(), location.key(), body, &metadata)
            .await?;

        Ok(StoredAttachment { metadata, location })
    }

    /// Open a download wrapped for HTTP delivery / 下载附件
    pub async fn download(&self, attachment: &Attachment) -> Result<StreamableObject> {
        let stream = self.open(attachment).await?;
        Ok(StreamableObject {
            stream,
            content_type: attachment.mime_type.clone(),
            length: attachment.size,
            disposition: content_disposition(&attachment.name),
        })
    }

    /// Read the whole attachment into memory / 读取为缓冲区
    pub async fn read_as_buffer(&self, attachment: &Attachment) -> Result<bytes::Bytes> {
        self.open(attachment).await?.collect_bytes().await
    }

    /// Return the live backend stream / 读取为流
    pub async fn read_as_stream(&self, attachment: &Attachment) -> Result<ObjectStream> {
        self.open(attachment).await
    }

    async fn open(&self, attachment: &Attachment) -> Result<ObjectStream> {
        let location = attachment.object_location()?;
        let active = self.active()?;
        tracing::debug!("Opening object: {}", location);
        active.driver.get_object(location.bucket(), location.key()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::memory::{MemoryDriverFactory, ReadFault};
    use crate::storage::UploadedFile;
    use bytes::Bytes;
    use futures::StreamExt;

    fn config(endpoint: &str, bucket: &str) -> ConnectionConfig {
        MinioSettings {
            endpoint: endpoint.to_string(),
            access_key: "minio".to_string(),
            secret_key: "minio123".to_string(),
            bucket: bucket.to_string(),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    fn setup() -> (Arc<MemoryDriverFactory>, ObjectStoreAdapter) {
        let factory = Arc::new(MemoryDriverFactory::new());
        let adapter = ObjectStoreAdapter::new(factory.clone());
        adapter.configure(config("minio", "hexa")).unwrap();
        (factory, adapter)
    }

    fn reference(location: &str) -> Attachment {
        Attachment {
            location: location.to_string(),
            name: "a.png".to_string(),
            size: 3,
            mime_type: "image/png".to_string(),
        }
    }

    #[tokio::test]
    async fn test_store_all_payload_shapes() {
        let (factory, adapter) = setup();
        let data = b"payload bytes".to_vec();
        let meta = || ObjectMetadata::new("doc.txt", data.len() as u64, "text/plain");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.tmp");
        std::fs::write(&path, &data).unwrap();

        let (tx, pushed) = Payload::channel(4);
        let chunks = data.clone();
        tokio::spawn(async move {
            for chunk in chunks.chunks(4) {
                tx.send(chunk.to_vec()).await.unwrap();
            }
        });

        let payloads = vec![
            Payload::from(data.clone()),
            Payload::reader(std::io::Cursor::new(data.clone())),
            pushed,
            Payload::File(UploadedFile::from_path(&path)),
            Payload::File(UploadedFile::from_buffer(data.clone())),
        ];

        for payload in payloads {
            let kind = payload.kind();
            let stored = adapter.store(payload, meta()).await.unwrap();
            let location = ObjectLocation::parse(&stored.location.to_string()).unwrap();
            assert_eq!(location.bucket(), "hexa", "{}", kind);
            assert!(!location.key().is_empty());

            let read = adapter.read_as_buffer(&stored.to_attachment()).await.unwrap();
            assert_eq!(read, Bytes::from(data.clone()), "{}", kind);
        }
        assert_eq!(factory.driver(0).unwrap().put_count(), 5);
    }

    #[tokio::test]
    async fn test_unsupported_payload_makes_no_backend_call() {
        let (factory, adapter) = setup();
        let err = adapter
            .store(
                Payload::File(UploadedFile::default()),
                ObjectMetadata::new("a.png", 0, "image/png"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedPayloadType(_)));
        assert_eq!(factory.driver(0).unwrap().put_count(), 0);
    }

    #[tokio::test]
    async fn test_aborted_push_stream_stores_nothing() {
        let (factory, adapter) = setup();
        let (tx, pushed) = Payload::channel(4);
        tx.send(b"abc".to_vec()).await.unwrap();
        tx.abort(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "client went away"))
            .await;

        let err = adapter
            .store(pushed, ObjectMetadata::new("a.png", 6, "image/png"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)), "{:?}", err);
        assert!(err.to_string().contains("client went away"));

        let driver = factory.driver(0).unwrap();
        assert_eq!(driver.put_count(), 1);
        assert_eq!(driver.object_count(), 0);
    }

    #[tokio::test]
    async fn test_store_from_stream() {
        let (_factory, adapter) = setup();
        let chunks: Vec<std::io::Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"stream")),
        ];
        let stored = adapter
            .store(
                Payload::stream(futures::stream::iter(chunks)),
                ObjectMetadata::new("note.txt", 12, "text/plain"),
            )
            .await
            .unwrap();

        assert!(stored.location.key().ends_with(".txt"));
        assert_eq!(
            adapter.read_as_buffer(&stored.to_attachment()).await.unwrap(),
            Bytes::from_static(b"hello stream")
        );
    }

    #[tokio::test]
    async fn test_same_name_never_overwrites() {
        let (factory, adapter) = setup();
        let first = adapter
            .store(Payload::from(b"one".to_vec()), ObjectMetadata::new("a.png", 3, "image/png"))
            .await
            .unwrap();
        let second = adapter
            .store(Payload::from(b"two".to_vec()), ObjectMetadata::new("a.png", 3, "image/png"))
            .await
            .unwrap();

        assert_ne!(first.location, second.location);
        for stored in [&first, &second] {
            let key = stored.location.key();
            assert!(key.starts_with("a-") && key.ends_with(".png"), "{}", key);
        }
        assert_eq!(factory.driver(0).unwrap().object_count(), 2);
        assert_eq!(
            adapter.read_as_buffer(&first.to_attachment()).await.unwrap(),
            Bytes::from_static(b"one")
        );
    }

    #[tokio::test]
    async fn test_malformed_location_makes_no_backend_call() {
        let (factory, adapter) = setup();
        let bad = reference("/onlybucket");

        assert!(matches!(
            adapter.download(&bad).await,
            Err(StorageError::MalformedLocation(_))
        ));
        assert!(matches!(
            adapter.read_as_buffer(&bad).await,
            Err(StorageError::MalformedLocation(_))
        ));
        assert!(matches!(
            adapter.read_as_stream(&bad).await,
            Err(StorageError::MalformedLocation(_))
        ));
        assert_eq!(factory.driver(0).unwrap().get_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_object_is_backend_error() {
        let (_, adapter) = setup();
        let err = adapter.read_as_buffer(&reference("/hexa/nope.png")).await.unwrap_err();
        assert!(err.is_backend());
    }

    #[tokio::test]
    async fn test_read_error_mid_stream_rejects_buffer() {
        let (factory, adapter) = setup();
        let data = vec![7u8; 64];
        let stored = adapter
            .store(Payload::from(data), ObjectMetadata::new("big.bin", 64, ""))
            .await
            .unwrap();

        let driver = factory.driver(0).unwrap();
        driver.set_chunk_size(8);
        driver.inject_read_fault(ReadFault::AfterChunks(2));

        let err = adapter.read_as_buffer(&stored.to_attachment()).await.unwrap_err();
        assert!(err.is_backend());
        assert!(err.to_string().contains("injected"));

        // Fault is one-shot
        let read = adapter.read_as_buffer(&stored.to_attachment()).await.unwrap();
        assert_eq!(read.len(), 64);
    }

    #[tokio::test]
    async fn test_download_wraps_stream() {
        let (_, adapter) = setup();
        let stored = adapter
            .store(Payload::from(b"abc".to_vec()), ObjectMetadata::new("报告 1.pdf", 3, "application/pdf"))
            .await
            .unwrap();

        let object = adapter.download(&stored.to_attachment()).await.unwrap();
        assert_eq!(object.content_type, "application/pdf");
        assert_eq!(object.length, 3);
        assert_eq!(
            object.disposition,
            "attachment; filename=\"%E6%8A%A5%E5%91%8A%201.pdf\""
        );
        assert_eq!(object.stream.collect_bytes().await.unwrap(), Bytes::from_static(b"abc"));
    }

    #[tokio::test]
    async fn test_read_as_stream_is_lazy() {
        let (factory, adapter) = setup();
        let stored = adapter
            .store(Payload::from(vec![1u8; 20]), ObjectMetadata::new("x.bin", 20, ""))
            .await
            .unwrap();
        factory.driver(0).unwrap().set_chunk_size(5);

        let mut stream = adapter.read_as_stream(&stored.to_attachment()).await.unwrap();
        let mut chunks = 0;
        while let Some(chunk) = stream.next().await {
            assert_eq!(chunk.unwrap().len(), 5);
            chunks += 1;
        }
        assert_eq!(chunks, 4);
    }

    #[tokio::test]
    async fn test_not_configured() {
        let adapter = ObjectStoreAdapter::new(Arc::new(MemoryDriverFactory::new()));
        assert!(!adapter.is_configured());
        let err = adapter
            .store(Payload::from(b"x".to_vec()), ObjectMetadata::new("x", 1, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_failed_reconfigure_keeps_previous_driver() {
        let (factory, adapter) = setup();
        factory.fail_next_create("endpoint unreachable");
        assert!(matches!(
            adapter.configure(config("other", "other")),
            Err(StorageError::Configuration(_))
        ));

        let mut bad = MinioSettings::default();
        bad.port = "not-a-port".to_string();
        assert!(adapter.apply_settings(&bad).is_err());

        let current = adapter.current_config().unwrap();
        assert_eq!(current.endpoint, "minio");
        assert_eq!(current.bucket, "hexa");
        assert_eq!(factory.created(), 1);
    }

    #[tokio::test]
    async fn test_reconfigure_mid_flight() {
        let (factory, adapter) = setup();
        let adapter = Arc::new(adapter);

        // Upload that stays open until we finish pushing / 上传中途重新配置
        let (tx, payload) = Payload::channel(1);
        let in_flight = {
            let adapter = adapter.clone();
            tokio::spawn(async move {
                adapter
                    .store(payload, ObjectMetadata::new("slow.bin", 6, ""))
                    .await
            })
        };
        // Capacity 1: the second send only returns once the driver is reading
        tx.send(b"abc".to_vec()).await.unwrap();
        tx.send(b"def".to_vec()).await.unwrap();

        adapter.configure(config("minio-2", "fresh")).unwrap();

        let after = adapter
            .store(Payload::from(b"new".to_vec()), ObjectMetadata::new("new.bin", 3, ""))
            .await
            .unwrap();

        drop(tx);
        let before = in_flight.await.unwrap().unwrap();

        assert_eq!(before.location.bucket(), "hexa");
        assert_eq!(after.location.bucket(), "fresh");

        let old = factory.driver(0).unwrap();
        let new = factory.driver(1).unwrap();
        assert_eq!(old.endpoint(), "http://minio:9000");
        assert_eq!(new.endpoint(), "http://minio-2:9000");
        assert_eq!(old.put_count(), 1);
        assert_eq!(new.put_count(), 1);
        assert_eq!(
            old.object(before.location.bucket(), before.location.key()).unwrap().data,
            Bytes::from_static(b"abcdef")
        );
        assert_eq!(
            adapter.read_as_buffer(&after.to_attachment()).await.unwrap(),
            Bytes::from_static(b"new")
        );
    }
}
