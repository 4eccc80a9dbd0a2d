#![allow(clippy::unwrap_used, clippy::panic, clippy::todo, clippy::missing_panics_doc, clippy::must_use_candidate, missing_debug_implementations, clippy::clone_on_ref_ptr, unreachable_pub, clippy::similar_names)]
use async_trait::async_trait;
use letterbox_server::AppBuilder;
use letterbox_server::adapters::storage::{ObjectStorage, StorageStream};
use letterbox_server::error::{AppError, Result};
use reqwest::StatusCode;
use std::sync::Arc;
mod common;

#[derive(Debug)]
struct UnreachableStorage;

#[async_trait]
impl ObjectStorage for UnreachableStorage {
    async fn put(&self, _key: &str, _stream: StorageStream, _len: Option<usize>, _max: usize) -> Result<()> {
        Err(AppError::Internal)
    }

    async fn get(&self, _key: &str) -> Result<(u64, StorageStream)> {
        Err(AppError::Internal)
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(AppError::Internal)
    }

    async fn ping(&self) -> Result<()> {
        Err(AppError::Internal)
    }
}

#[tokio::test]
async fn test_livez() {
    let app = common::TestApp::spawn().await;

    let resp = app.client.get(format!("{}/livez", app.mgmt_url)).send().await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readyz_happy_path() {
    let app = common::TestApp::spawn().await;

    let resp = app.client.get(format!("{}/readyz", app.mgmt_url)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
    assert_eq!(body["storage"], "ok");
}

#[tokio::test]
async fn test_readyz_storage_error() {
    let config = common::get_test_config();
    let builder = AppBuilder::new(config.clone()).with_storage(Arc::new(UnreachableStorage));
    let app = common::TestApp::spawn_with_builder(config, builder).await;

    let resp = app.client.get(format!("{}/readyz", app.mgmt_url)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["database"], "ok");
    assert_eq!(body["storage"], "error");
}

#[tokio::test]
async fn test_health_is_not_on_api_listener() {
    let app = common::TestApp::spawn().await;

    let resp = app.client.get(format!("{}/readyz", app.server_url)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
