//! S3 compatible object storage driver (MinIO, AWS S3, OSS, COS) / S3对象存储驱动

pub mod driver;
pub mod factory;

pub use driver::S3Driver;
pub use factory::S3DriverFactory;
