use crate::adapters::storage::{ObjectStorage, StorageStream};
use crate::config::StorageConfig;
use crate::domain::access::Caller;
use crate::error::{AppError, Result};
use crate::services::message_service::MessageService;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub(crate) struct Metrics {
    pub(crate) uploaded_bytes: Counter<u64>,
    pub(crate) upload_size_bytes: Histogram<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("letterbox-server");
        Self {
            uploaded_bytes: meter
                .u64_counter("letterbox_images_uploaded_bytes")
                .with_description("Total bytes of message images uploaded")
                .build(),
            upload_size_bytes: meter
                .u64_histogram("letterbox_image_upload_size_bytes")
                .with_description("Distribution of message image sizes")
                .build(),
        }
    }
}

/// The single image attached to a message, stored under the message ID.
#[derive(Clone, Debug)]
pub struct ImageService {
    storage: Arc<dyn ObjectStorage>,
    messages: MessageService,
    max_size_bytes: usize,
    metrics: Metrics,
}

impl ImageService {
    #[must_use]
    pub fn new(storage: Arc<dyn ObjectStorage>, messages: MessageService, config: &StorageConfig) -> Self {
        Self { storage, messages, max_size_bytes: config.image_max_size_bytes, metrics: Metrics::new() }
    }

    /// Stores the image of a message after checking the caller's password.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the message does not exist.
    /// Returns `AppError::Unauthorized` if the message is protected and the password is missing or wrong.
    /// Returns `AppError::BadRequest` if the image exceeds the size limit.
    #[tracing::instrument(
        err(level = "warn"),
        skip(self, caller, id, stream),
        fields(message_id = %id, image_size = tracing::field::Empty)
    )]
    pub async fn upload(
        &self,
        caller: &Caller,
        id: &str,
        content_len: Option<usize>,
        stream: StorageStream,
    ) -> Result<()> {
        if !self.messages.verify_password(caller, id).await? {
            return Err(AppError::Unauthorized);
        }

        if let Some(len) = content_len {
            tracing::Span::current().record("image_size", len);
            if len > self.max_size_bytes {
                return Err(AppError::BadRequest("Image too large".into()));
            }
        }

        self.storage.put(&object_key(id), stream, content_len, self.max_size_bytes).await?;

        tracing::debug!("Image stored");
        if let Some(len) = content_len {
            self.metrics.uploaded_bytes.add(len as u64, &[]);
            self.metrics.upload_size_bytes.record(len as u64, &[]);
        }
        Ok(())
    }

    /// Streams the image of a message, gated like the message content.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the message or its image does not exist.
    /// Returns `AppError::Unauthorized` if the message is protected and the password is missing or wrong.
    #[tracing::instrument(err(level = "warn"), skip(self, caller, id), fields(message_id = %id))]
    pub async fn download(&self, caller: &Caller, id: &str) -> Result<(u64, StorageStream)> {
        if !self.messages.verify_password(caller, id).await? {
            return Err(AppError::Unauthorized);
        }
        self.storage.get(&object_key(id)).await
    }

    /// Removes the images of deleted messages. Failures are logged and otherwise ignored.
    pub async fn discard(&self, ids: &[String]) {
        for id in ids {
            if let Err(e) = self.storage.delete(&object_key(id)).await {
                tracing::warn!(error = %e, message_id = %id, "Failed to remove message image");
            }
        }
    }
}

fn object_key(message_id: &str) -> String {
    format!("messages/{message_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryMessageStore;
    use crate::adapters::message_store::MessageStore;
    use crate::adapters::storage::InMemoryStorage;
    use crate::domain::message::NewMessage;
    use crate::services::credential_service::CredentialService;
    use crate::services::credential_service::tests::cheap_config;
    use bytes::Bytes;
    use futures::StreamExt;

    async fn setup() -> ImageService {
        let store: Arc<dyn MessageStore> = Arc::new(InMemoryMessageStore::new());
        let messages = MessageService::new(store, CredentialService::new(&cheap_config()).unwrap());
        let admin = Caller::admin("p1");
        messages
            .create(&admin, NewMessage { id: Some("open".into()), ..NewMessage::default() })
            .await
            .unwrap();
        messages
            .create(
                &admin,
                NewMessage { id: Some("locked".into()), initial_password: Some("abc".into()), ..NewMessage::default() },
            )
            .await
            .unwrap();

        let config = StorageConfig {
            bucket: None,
            region: "us-east-1".into(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            force_path_style: false,
            image_max_size_bytes: 8,
        };
        ImageService::new(Arc::new(InMemoryStorage::new()), messages, &config)
    }

    fn body(bytes: &'static [u8]) -> StorageStream {
        futures::stream::once(async move { Ok(Bytes::from_static(bytes)) }).boxed()
    }

    #[tokio::test]
    async fn test_upload_requires_password_on_protected_message() {
        let service = setup().await;
        let wrong = Caller::anonymous(Some("nope".into()));
        let right = Caller::anonymous(Some("abc".into()));

        assert!(matches!(service.upload(&wrong, "locked", Some(3), body(b"img")).await, Err(AppError::Unauthorized)));
        service.upload(&right, "locked", Some(3), body(b"img")).await.unwrap();

        let (len, _) = service.download(&right, "locked").await.unwrap();
        assert_eq!(len, 3);
        assert!(matches!(service.download(&wrong, "locked").await, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_upload_to_open_message() {
        let service = setup().await;
        service.upload(&Caller::anonymous(None), "open", None, body(b"img")).await.unwrap();
        assert!(service.download(&Caller::anonymous(None), "open").await.is_ok());
    }

    #[tokio::test]
    async fn test_upload_size_limit_and_missing_message() {
        let service = setup().await;
        let caller = Caller::anonymous(None);

        assert!(matches!(
            service.upload(&caller, "open", Some(100), body(b"img")).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(service.upload(&caller, "ghost", None, body(b"img")).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_oversized_upload_to_missing_message_is_not_found() {
        let service = setup().await;
        let caller = Caller::anonymous(None);

        assert!(matches!(service.upload(&caller, "ghost", Some(100), body(b"img")).await, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_oversized_upload_checks_password_first() {
        let service = setup().await;
        let wrong = Caller::anonymous(Some("nope".into()));

        assert!(matches!(service.upload(&wrong, "locked", Some(100), body(b"img")).await, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_discard_removes_images() {
        let service = setup().await;
        let caller = Caller::anonymous(None);
        service.upload(&caller, "open", None, body(b"img")).await.unwrap();

        service.discard(&["open".to_string(), "never-uploaded".to_string()]).await;
        assert!(matches!(service.download(&caller, "open").await, Err(AppError::NotFound)));
    }
}
