//! S3驱动工厂

use anyhow::Result;
use std::sync::Arc;

use crate::settings::ConnectionConfig;
use crate::storage::{DriverBox, DriverFactory};
use super::driver::S3Driver;

/// S3驱动工厂
pub struct S3DriverFactory;

impl DriverFactory for S3DriverFactory {
    fn driver_type(&self) -> &'static str {
        "s3"
    }

    fn create_driver(&self, config: &ConnectionConfig) -> Result<DriverBox> {
        Ok(Arc::new(S3Driver::new(config)?))
    }
}
