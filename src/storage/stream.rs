//! Read-side streams / 读取流
//!
//! `ObjectStream` owns the backend connection; dropping it on any exit path
//! releases that connection.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::{Bytes, BytesMut};
use futures::stream::{BoxStream, Stream, StreamExt, TryStreamExt};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

use crate::error::{BackendError, Result, StorageError};

/// Lazy byte stream of one stored object / 对象字节流
pub struct ObjectStream {
    inner: BoxStream<'static, Result<Bytes>>,
}

impl ObjectStream {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: stream.boxed(),
        }
    }

    /// Adapt a driver-native chunk stream / 适配驱动原生数据流
    ///
    /// Chunks of any byte representation convertible to `Bytes` are accepted;
    /// errors become `StorageError::Backend`.
    pub fn from_backend<S, B, E>(stream: S) -> Self
    where
        S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
        B: Into<Bytes>,
        E: Into<BackendError>,
    {
        Self::new(stream.map(|item| item.map(Into::into).map_err(StorageError::backend)))
    }

    /// Read the whole object into one buffer / 读取整个对象
    ///
    /// The first chunk error fails the read; nothing partial is returned.
    pub async fn collect_bytes(mut self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.inner.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Use as a tokio reader / 转换为 AsyncRead
    pub fn into_async_read(self) -> impl AsyncRead + Send + Unpin {
        StreamReader::new(self.inner.map_err(io::Error::other))
    }
}

impl Stream for ObjectStream {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for ObjectStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ObjectStream")
    }
}

/// `attachment; filename="<percent-encoded name>"` / 生成下载头
pub fn content_disposition(name: &str) -> String {
    format!("attachment; filename=\"{}\"", urlencoding::encode(name))
}

/// Download result ready for HTTP delivery / 可直接返回的下载结果
#[derive(Debug)]
pub struct StreamableObject {
    pub stream: ObjectStream,
    pub content_type: String,
    pub length: u64,
    pub disposition: String,
}

impl IntoResponse for StreamableObject {
    fn into_response(self) -> Response {
        let content_type = if self.content_type.is_empty() {
            "application/octet-stream".to_string()
        } else {
            self.content_type
        };

        let response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, self.length)
            .header(header::CONTENT_DISPOSITION, self.disposition)
            .body(Body::from_stream(self.stream));

        match response {
            Ok(r) => r,
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        }
    }
}
