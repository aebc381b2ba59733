//! Upload payload shapes / 上传数据形态
//!
//! One variant per shape the host can hand over. `into_body` turns any of them
//! into the single `UploadBody` a driver consumes.

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use std::io;
use std::path::PathBuf;
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::StreamReader;

use super::UploadBody;
use crate::error::{Result, StorageError};

pub enum Payload {
    /// In-memory bytes / 内存数据
    Buffer(Bytes),
    /// Pull-style reader / 拉取式读取流
    Reader(Box<dyn AsyncRead + Send + Unpin>),
    /// Push-style stream, adapted to a reader before upload / 推送式数据流
    Stream(BoxStream<'static, io::Result<Bytes>>),
    /// Uploaded file descriptor from the host / 宿主上传的文件描述
    File(UploadedFile),
}

/// Host upload descriptor: a temp file on disk or an in-memory buffer / 上传文件描述
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub original_name: Option<String>,
    pub path: Option<PathBuf>,
    pub buffer: Option<Bytes>,
}

impl UploadedFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn from_buffer(buffer: impl Into<Bytes>) -> Self {
        Self {
            buffer: Some(buffer.into()),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.original_name = Some(name.to_string());
        self
    }
}

/// Sending half of a push-style payload / 推送式数据的发送端
///
/// Dropping the sender ends the payload.
#[derive(Clone)]
pub struct PayloadSender {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

impl PayloadSender {
    /// Push one chunk; fails once the upload side is gone / 推送一个数据块
    pub async fn send(&self, chunk: impl Into<Bytes>) -> io::Result<()> {
        self.tx
            .send(Ok(chunk.into()))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "payload receiver closed"))
    }

    /// Abort the upload with an error / 以错误终止上传
    pub async fn abort(self, err: io::Error) {
        let _ = self.tx.send(Err(err)).await;
    }
}

impl Payload {
    /// Push-style payload fed through a bounded channel / 创建推送式数据通道
    pub fn channel(capacity: usize) -> (PayloadSender, Payload) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let stream = ReceiverStream::new(rx).boxed();
        (PayloadSender { tx }, Payload::Stream(stream))
    }

    pub fn reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Payload::Reader(Box::new(reader))
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: futures::Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Payload::Stream(stream.boxed())
    }

    /// Shape name for logs and errors / 数据形态名称
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Buffer(_) => "buffer",
            Payload::Reader(_) => "reader",
            Payload::Stream(_) => "stream",
            Payload::File(_) => "file",
        }
    }

    /// Normalize into the body a driver uploads / 转换为上传数据
    ///
    /// A file descriptor with a path opens a fresh read stream from disk; the
    /// path wins over the buffer when both are set.
    pub async fn into_body(self) -> Result<UploadBody> {
        match self {
            Payload::Buffer(bytes) => Ok(UploadBody::Bytes(bytes)),
            Payload::Reader(reader) => Ok(UploadBody::Reader(reader)),
            Payload::Stream(stream) => Ok(UploadBody::Reader(Box::new(StreamReader::new(stream)))),
            Payload::File(file) => {
                if let Some(path) = file.path {
                    let f = tokio::fs::File::open(&path).await?;
                    Ok(UploadBody::Reader(Box::new(f)))
                } else if let Some(buffer) = file.buffer {
                    Ok(UploadBody::Bytes(buffer))
                } else {
                    Err(StorageError::UnsupportedPayloadType(format!(
                        "uploaded file {:?} has neither a path nor a buffer",
                        file.original_name.unwrap_or_default()
                    )))
                }
            }
        }
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::File(file) => f.debug_tuple("File").field(file).finish(),
            other => write!(f, "Payload::{}", other.kind()),
        }
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Buffer(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Self {
        Payload::Buffer(Bytes::from(data))
    }
}

impl From<UploadedFile> for Payload {
    fn from(file: UploadedFile) -> Self {
        Payload::File(file)
    }
}
