use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

pub mod memory;
pub mod s3;

pub use memory::InMemoryStorage;
pub use s3::S3Storage;

pub type StorageStream = BoxStream<'static, std::result::Result<Bytes, std::io::Error>>;

#[async_trait]
pub trait ObjectStorage: Send + Sync + std::fmt::Debug + 'static {
    /// Stores `stream` under `key`, replacing any previous object.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if the body grows past `max_size`.
    async fn put(&self, key: &str, stream: StorageStream, content_len: Option<usize>, max_size: usize) -> Result<()>;

    /// # Errors
    /// Returns `AppError::NotFound` if no object exists under `key`.
    async fn get(&self, key: &str) -> Result<(u64, StorageStream)>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn ping(&self) -> Result<()>;
}
