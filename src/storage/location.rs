//! Object location handle / 对象位置
//!
//! A location is `"/" + bucket + "/" + key`. Keys never contain `/`, so a
//! location always has exactly two segments after the leading slash.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StorageError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocation {
    bucket: String,
    key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        let bucket = bucket.into();
        let key = key.into();
        if !valid_segment(&bucket) || !valid_segment(&key) {
            return Err(StorageError::MalformedLocation(format!("/{}/{}", bucket, key)));
        }
        Ok(Self { bucket, key })
    }

    /// Parse `/<bucket>/<key>`; extra or empty segments are rejected / 解析位置字符串
    pub fn parse(location: &str) -> Result<Self> {
        let malformed = || StorageError::MalformedLocation(location.to_string());

        let rest = location.strip_prefix('/').ok_or_else(malformed)?;
        let mut parts = rest.split('/');
        let bucket = parts.next().ok_or_else(malformed)?;
        let key = parts.next().ok_or_else(malformed)?;
        if parts.next().is_some() || bucket.is_empty() || key.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.contains('/')
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.bucket, self.key)
    }
}

impl FromStr for ObjectLocation {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for ObjectLocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ObjectLocation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
