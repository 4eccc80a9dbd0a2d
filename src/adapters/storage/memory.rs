use crate::adapters::storage::{ObjectStorage, StorageStream};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Object storage backed by process memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStorage {
    objects: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl InMemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    async fn put(
        &self,
        key: &str,
        mut stream: StorageStream,
        _content_len: Option<usize>,
        max_size: usize,
    ) -> Result<()> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                tracing::warn!(error = %e, key = %key, "Upload stream failed");
                AppError::BadRequest("Upload interrupted".into())
            })?;
            if buf.len() + chunk.len() > max_size {
                return Err(AppError::BadRequest("Image too large".into()));
            }
            buf.extend_from_slice(&chunk);
        }

        self.objects.write().await.insert(key.to_string(), buf.freeze());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<(u64, StorageStream)> {
        let bytes = self.objects.read().await.get(key).cloned().ok_or(AppError::NotFound)?;
        let len = bytes.len() as u64;
        Ok((len, futures::stream::once(async move { Ok(bytes) }).boxed()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
