pub mod config;
pub mod error;
pub mod settings;
pub mod storage;
pub mod utils;

// Driver modules (point to project root drivers via path attribute) / 驱动模块
#[path = "../drivers/mod.rs"]
pub mod drivers;

pub use error::{Result, StorageError};
pub use settings::{ConnectionConfig, MinioSettings};
pub use storage::{
    Attachment, ObjectLocation, ObjectMetadata, ObjectStoreAdapter, ObjectStream, Payload,
    StoredAttachment, StreamableObject, UploadedFile,
};

/// Unconfigured adapter for the given driver type / 创建未配置的适配器
pub fn adapter_for(driver_type: &str) -> anyhow::Result<ObjectStoreAdapter> {
    let factory = drivers::factory_for(driver_type)
        .ok_or_else(|| anyhow::anyhow!("Driver type not found: {}", driver_type))?;
    Ok(ObjectStoreAdapter::new(factory))
}

/// Build an adapter for the given driver type and apply the settings / 创建并配置适配器
pub fn build_adapter(driver_type: &str, settings: &MinioSettings) -> anyhow::Result<ObjectStoreAdapter> {
    let adapter = adapter_for(driver_type)?;
    adapter.apply_settings(settings)?;
    Ok(adapter)
}
