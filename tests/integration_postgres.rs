#![allow(clippy::unwrap_used, clippy::panic, clippy::todo, clippy::missing_panics_doc, clippy::must_use_candidate, missing_debug_implementations, clippy::clone_on_ref_ptr, unreachable_pub, clippy::similar_names)]
//! Store and HTTP flows against a real Postgres. Skipped when `DATABASE_URL` is unset.
use common::{GATEWAY_HEADER, unique};
use letterbox_server::adapters::database::message_repo::MessageRepository;
use letterbox_server::adapters::message_store::MessageStore;
use letterbox_server::domain::message::{
    FieldUpdate, HashGuard, MessageDraft, MessagePatch, PasswordDigest, UpdateOutcome,
};
use letterbox_server::error::AppError;
use reqwest::StatusCode;
use serde_json::{Value, json};
mod common;

async fn repo() -> Option<MessageRepository> {
    common::get_test_pool().await.map(MessageRepository::new)
}

fn digest(raw: &str) -> PasswordDigest {
    PasswordDigest::new(raw.to_string())
}

fn draft(id: &str, project_id: &str, password_hash: Option<&str>) -> MessageDraft {
    MessageDraft {
        id: id.to_string(),
        project_id: project_id.to_string(),
        content: Some(json!({"text": "hi"})),
        password_hash: password_hash.map(digest),
        hint: Some("pet".to_string()),
    }
}

fn rotate_to(raw: &str) -> MessagePatch {
    MessagePatch { password_hash: FieldUpdate::Set(digest(raw)), ..MessagePatch::default() }
}

#[tokio::test]
async fn test_insert_and_find_round_trip() {
    let Some(repo) = repo().await else { return };
    let id = unique("m");

    let inserted = repo.insert(draft(&id, "p1", Some("h1"))).await.unwrap();
    assert_eq!(inserted.created_at, inserted.updated_at);

    let found = repo.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(found.project_id, "p1");
    assert_eq!(found.content, Some(json!({"text": "hi"})));
    assert_eq!(found.password_hash.unwrap().as_str(), "h1");
    assert_eq!(found.hint.as_deref(), Some("pet"));

    assert!(repo.find_by_id(&unique("ghost")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_insert_duplicate_id_is_conflict() {
    let Some(repo) = repo().await else { return };
    let id = unique("dup");
    repo.insert(draft(&id, "p1", None)).await.unwrap();

    let err = repo.insert(draft(&id, "p2", None)).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_update_with_stale_guard_leaves_row() {
    let Some(repo) = repo().await else { return };
    let id = unique("m");
    repo.insert(draft(&id, "p1", Some("h1"))).await.unwrap();

    let outcome = repo.update(&id, HashGuard::Unchanged(Some(digest("other"))), rotate_to("h2")).await.unwrap();
    assert!(matches!(outcome, UpdateOutcome::Stale));
    assert_eq!(repo.find_by_id(&id).await.unwrap().unwrap().password_hash.unwrap().as_str(), "h1");

    let outcome = repo.update(&id, HashGuard::Unchanged(None), rotate_to("h2")).await.unwrap();
    assert!(matches!(outcome, UpdateOutcome::Stale));

    let outcome = repo.update(&id, HashGuard::Unchanged(Some(digest("h1"))), rotate_to("h2")).await.unwrap();
    let UpdateOutcome::Updated(message) = outcome else { panic!("expected update") };
    assert_eq!(message.password_hash.unwrap().as_str(), "h2");
    assert!(message.updated_at >= message.created_at);
}

#[tokio::test]
async fn test_update_guard_matches_open_message() {
    let Some(repo) = repo().await else { return };
    let id = unique("open");
    repo.insert(draft(&id, "p1", None)).await.unwrap();

    let patch = MessagePatch { content: FieldUpdate::Set(json!("new")), ..MessagePatch::default() };
    let outcome = repo.update(&id, HashGuard::Unchanged(None), patch).await.unwrap();
    let UpdateOutcome::Updated(message) = outcome else { panic!("expected update") };
    assert_eq!(message.content, Some(json!("new")));
    assert!(message.password_hash.is_none());
}

#[tokio::test]
async fn test_update_vanished_row_is_missing() {
    let Some(repo) = repo().await else { return };

    let outcome = repo.update(&unique("ghost"), HashGuard::Any, rotate_to("h2")).await.unwrap();
    assert!(matches!(outcome, UpdateOutcome::Missing));

    let outcome =
        repo.update(&unique("ghost"), HashGuard::Unchanged(Some(digest("h1"))), rotate_to("h2")).await.unwrap();
    assert!(matches!(outcome, UpdateOutcome::Missing));
}

#[tokio::test]
async fn test_update_keeps_clears_and_sets_each_column() {
    let Some(repo) = repo().await else { return };
    let id = unique("m");
    repo.insert(draft(&id, "p1", Some("h1"))).await.unwrap();

    let UpdateOutcome::Updated(kept) = repo.update(&id, HashGuard::Any, MessagePatch::default()).await.unwrap() else {
        panic!("expected update")
    };
    assert_eq!(kept.content, Some(json!({"text": "hi"})));
    assert_eq!(kept.password_hash.as_ref().map(PasswordDigest::as_str), Some("h1"));
    assert_eq!(kept.hint.as_deref(), Some("pet"));

    let patch = MessagePatch {
        content: FieldUpdate::Clear,
        password_hash: FieldUpdate::Keep,
        hint: FieldUpdate::Set("new hint".to_string()),
    };
    let UpdateOutcome::Updated(mixed) = repo.update(&id, HashGuard::Any, patch).await.unwrap() else {
        panic!("expected update")
    };
    assert!(mixed.content.is_none());
    assert_eq!(mixed.password_hash.as_ref().map(PasswordDigest::as_str), Some("h1"));
    assert_eq!(mixed.hint.as_deref(), Some("new hint"));

    let patch = MessagePatch {
        content: FieldUpdate::Set(json!([1, 2, 3])),
        password_hash: FieldUpdate::Clear,
        hint: FieldUpdate::Clear,
    };
    let UpdateOutcome::Updated(cleared) = repo.update(&id, HashGuard::Any, patch).await.unwrap() else {
        panic!("expected update")
    };
    assert_eq!(cleared.content, Some(json!([1, 2, 3])));
    assert!(cleared.password_hash.is_none());
    assert!(cleared.hint.is_none());

    let stored = repo.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(stored.content, cleared.content);
    assert!(stored.password_hash.is_none());
}

#[tokio::test]
async fn test_list_and_delete_by_project_are_scoped() {
    let Some(repo) = repo().await else { return };
    let project = unique("proj");
    let other = unique("proj");
    let first = unique("a");
    let second = unique("b");
    let elsewhere = unique("c");

    repo.insert(draft(&first, &project, None)).await.unwrap();
    repo.insert(draft(&second, &project, None)).await.unwrap();
    repo.insert(draft(&elsewhere, &other, None)).await.unwrap();

    let listed: Vec<String> = repo.list_by_project(&project).await.unwrap().into_iter().map(|m| m.id).collect();
    assert_eq!(listed.len(), 2);
    assert!(listed.contains(&first) && listed.contains(&second));

    let mut deleted = repo.delete_by_project(&project).await.unwrap();
    deleted.sort();
    let mut expected = vec![first.clone(), second];
    expected.sort();
    assert_eq!(deleted, expected);

    assert!(repo.find_by_id(&elsewhere).await.unwrap().is_some());
    assert!(repo.list_by_project(&project).await.unwrap().is_empty());
    assert!(!repo.delete(&first).await.unwrap());
    assert!(repo.delete(&elsewhere).await.unwrap());
}

#[tokio::test]
async fn test_ping() {
    let Some(repo) = repo().await else { return };
    repo.ping().await.unwrap();
}

#[tokio::test]
async fn test_http_flow_against_postgres() {
    let Some(app) = common::TestApp::spawn_with_database().await else { return };
    let project = unique("proj");
    let id = unique("m");

    app.create_protected(&project, &id, "abc").await;
    assert_eq!(app.read(&id, Some("wrong")).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.read(&id, Some("abc")).await.status(), StatusCode::OK);

    let resp = app
        .client
        .patch(format!("{}/message/{id}/password", app.server_url))
        .json(&json!({"currentPassword": "abc", "newPassword": "xyz"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.read(&id, Some("abc")).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.read(&id, Some("xyz")).await.status(), StatusCode::OK);

    let resp = app
        .client
        .patch(format!("{}/admin/message/{project}/{id}", app.server_url))
        .header(GATEWAY_HEADER, app.admin_token(&[project.as_str()]))
        .json(&json!({"password": null}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["protected"], false);
    assert_eq!(body["content"], json!({"text": "secret"}));
    assert_eq!(app.read(&id, None).await.status(), StatusCode::OK);

    let resp = app
        .client
        .delete(format!("{}/admin/message/{project}", app.server_url))
        .header(GATEWAY_HEADER, app.admin_token(&[project.as_str()]))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["deleted"], 1);
}
