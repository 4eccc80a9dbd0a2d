use crate::adapters::storage::{ObjectStorage, StorageStream};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use futures::StreamExt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::Instrument;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Message images in an S3 bucket.
#[derive(Clone, Debug)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    #[must_use]
    pub const fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

/// Request body fed from a channel.
///
/// The SDK wants a `Sync` body while the upload stream is only `Send`, so the
/// stream is drained by a task and handed over one chunk at a time.
struct ChannelBody {
    chunks: Mutex<mpsc::Receiver<std::result::Result<Bytes, BoxError>>>,
}

impl http_body::Body for ChannelBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<std::result::Result<http_body::Frame<Bytes>, BoxError>>> {
        let mut chunks = self.chunks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        chunks.poll_recv(cx).map(|next| next.map(|chunk| chunk.map(http_body::Frame::data)))
    }
}

/// Forwards `stream` into a `ChannelBody`, cutting it off past `max_size`.
///
/// The returned flag is raised when the cut-off happened.
fn size_limited_body(mut stream: StorageStream, max_size: usize) -> (ChannelBody, Arc<AtomicBool>) {
    let (tx, rx) = mpsc::channel(2);
    let overflowed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&overflowed);

    tokio::spawn(
        async move {
            let mut seen = 0usize;
            while let Some(item) = stream.next().await {
                let forwarded = match item {
                    Ok(chunk) if seen + chunk.len() > max_size => {
                        flag.store(true, Ordering::Relaxed);
                        Err(BoxError::from("image exceeds size limit"))
                    }
                    Ok(chunk) => {
                        seen += chunk.len();
                        Ok(chunk)
                    }
                    Err(e) => Err(BoxError::from(e)),
                };
                let stop = forwarded.is_err();
                if tx.send(forwarded).await.is_err() || stop {
                    break;
                }
            }
        }
        .instrument(tracing::debug_span!("image_upload_bridge")),
    );

    (ChannelBody { chunks: Mutex::new(rx) }, overflowed)
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn put(&self, key: &str, stream: StorageStream, content_len: Option<usize>, max_size: usize) -> Result<()> {
        let (body, overflowed) = size_limited_body(stream, max_size);

        let sent = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .set_content_length(content_len.and_then(|len| i64::try_from(len).ok()))
            .content_type("application/octet-stream")
            .body(ByteStream::from_body_1_x(body))
            .send()
            .await;

        match sent {
            Ok(_) => Ok(()),
            Err(_) if overflowed.load(Ordering::Relaxed) => Err(AppError::BadRequest("Image too large".into())),
            Err(e) => {
                tracing::error!(error = ?e, key = %key, "Image upload failed");
                Err(AppError::Internal)
            }
        }
    }

    async fn get(&self, key: &str) -> Result<(u64, StorageStream)> {
        let output = self.client.get_object().bucket(&self.bucket).key(key).send().await.map_err(|e| {
            if e.as_service_error().is_some_and(aws_sdk_s3::operation::get_object::GetObjectError::is_no_such_key) {
                AppError::NotFound
            } else {
                tracing::error!(error = ?e, key = %key, "Image download failed");
                AppError::Internal
            }
        })?;

        let len = output.content_length.and_then(|l| u64::try_from(l).ok()).unwrap_or(0);
        let body = futures::stream::unfold(output.body, |mut body| async move {
            let next = body.next().await?;
            let chunk = next.map_err(|e| {
                tracing::warn!(error = ?e, "Image stream interrupted");
                std::io::Error::other(e)
            });
            Some((chunk, body))
        })
        .boxed();

        Ok((len, body))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client.delete_object().bucket(&self.bucket).key(key).send().await.map_err(|e| {
            tracing::error!(error = ?e, key = %key, "Image delete failed");
            AppError::Internal
        })?;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.client.head_bucket().bucket(&self.bucket).send().await.map_err(|e| {
            tracing::warn!(error = ?e, bucket = %self.bucket, "Bucket check failed");
            AppError::Internal
        })?;
        Ok(())
    }
}
