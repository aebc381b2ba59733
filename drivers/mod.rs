// Driver package / 驱动包
pub mod memory;
pub mod s3;

use std::sync::Arc;

use crate::storage::DriverFactory;

/// Look up a driver factory by type name / 按类型获取驱动工厂
pub fn factory_for(driver_type: &str) -> Option<Arc<dyn DriverFactory>> {
    match driver_type {
        "s3" | "minio" => Some(Arc::new(s3::S3DriverFactory)),
        "memory" => Some(Arc::new(memory::MemoryDriverFactory::new())),
        _ => None,
    }
}
