#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod telemetry;

use crate::adapters::database::DbPool;
use crate::adapters::database::message_repo::MessageRepository;
use crate::adapters::memory::InMemoryMessageStore;
use crate::adapters::message_store::MessageStore;
use crate::adapters::storage::{InMemoryStorage, ObjectStorage, S3Storage};
use crate::api::ServiceContainer;
use crate::config::{Config, StorageConfig};
use crate::services::credential_service::CredentialService;
use crate::services::health_service::HealthService;
use crate::services::image_service::ImageService;
use crate::services::message_service::MessageService;
use std::sync::Arc;
use tokio::sync::watch;

/// Wires adapters into services.
///
/// Backends that are not provided fall back to process memory.
#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    store: Option<Arc<dyn MessageStore>>,
    storage: Option<Arc<dyn ObjectStorage>>,
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, store: None, storage: None }
    }

    #[must_use]
    pub fn with_database(self, pool: DbPool) -> Self {
        self.with_store(Arc::new(MessageRepository::new(pool)))
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn MessageStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_s3(self, client: aws_sdk_s3::Client, bucket: String) -> Self {
        self.with_storage(Arc::new(S3Storage::new(client, bucket)))
    }

    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Builds the service graph.
    ///
    /// # Errors
    /// Returns an error if the credential parameters are invalid.
    pub fn build(self) -> anyhow::Result<ServiceContainer> {
        let store = self.store.unwrap_or_else(|| {
            tracing::warn!("No database configured, messages are kept in memory");
            Arc::new(InMemoryMessageStore::new())
        });
        let storage = self.storage.unwrap_or_else(|| {
            tracing::warn!("No storage bucket configured, images are kept in memory");
            Arc::new(InMemoryStorage::new())
        });

        let credentials = CredentialService::new(&self.config.credentials)?;
        let message_service = MessageService::new(Arc::clone(&store), credentials);
        let image_service = ImageService::new(Arc::clone(&storage), message_service.clone(), &self.config.storage);
        let health_service = HealthService::new(store, storage, self.config.health.clone());

        Ok(ServiceContainer { message_service, image_service, health_service })
    }
}

/// Builds an S3 client from the storage settings.
pub async fn initialize_s3_client(config: &StorageConfig) -> aws_sdk_s3::Client {
    let region_provider = aws_config::Region::new(config.region.clone());
    let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region_provider);

    if let Some(ref endpoint) = config.endpoint {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    if let (Some(ak), Some(sk)) = (&config.access_key, &config.secret_key) {
        let creds = aws_credential_types::Credentials::new(ak.clone(), sk.clone(), None, None, "static");
        config_loader = config_loader.credentials_provider(creds);
    }

    let sdk_config = config_loader.load().await;
    let s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(config.force_path_style);
    aws_sdk_s3::Client::from_conf(s3_config_builder.build())
}

/// Flips the shutdown channel on SIGINT or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
                        _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down"),
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                    let _ = ctrl_c.await;
                    tracing::info!("Received Ctrl+C, shutting down");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            tracing::info!("Received Ctrl+C, shutting down");
        }

        let _ = shutdown_tx.send(true);
    });
}

/// Routes panics through tracing before the default hook runs.
pub fn setup_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info.location().map(ToString::to_string).unwrap_or_default();
        tracing::error!(panic = %info, location = %location, "Thread panicked");
        original_hook(info);
    }));
}
