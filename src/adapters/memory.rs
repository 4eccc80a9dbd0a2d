use crate::adapters::message_store::MessageStore;
use crate::domain::message::{HashGuard, Message, MessageDraft, MessagePatch, UpdateOutcome};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;

#[derive(Debug)]
struct Entry {
    seq: u64,
    message: Message,
}

#[derive(Debug, Default)]
struct Inner {
    next_seq: u64,
    entries: HashMap<String, Entry>,
}

/// Message store backed by process memory. Contents do not survive a restart.
#[derive(Clone, Debug, Default)]
pub struct InMemoryMessageStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryMessageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn insert(&self, draft: MessageDraft) -> Result<Message> {
        let mut inner = self.inner.write().await;
        if inner.entries.contains_key(&draft.id) {
            return Err(AppError::Conflict(format!("Message {} already exists", draft.id)));
        }

        let now = OffsetDateTime::now_utc();
        let message = Message {
            id: draft.id,
            project_id: draft.project_id,
            content: draft.content,
            password_hash: draft.password_hash,
            hint: draft.hint,
            created_at: now,
            updated_at: now,
        };

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.insert(message.id.clone(), Entry { seq, message: message.clone() });
        Ok(message)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Message>> {
        Ok(self.inner.read().await.entries.get(id).map(|e| e.message.clone()))
    }

    async fn list_by_project(&self, project_id: &str) -> Result<Vec<Message>> {
        let inner = self.inner.read().await;
        let mut entries: Vec<&Entry> = inner.entries.values().filter(|e| e.message.project_id == project_id).collect();
        entries.sort_by_key(|e| (e.message.created_at, e.seq));
        Ok(entries.into_iter().map(|e| e.message.clone()).collect())
    }

    async fn update(&self, id: &str, guard: HashGuard, patch: MessagePatch) -> Result<UpdateOutcome> {
        let mut inner = self.inner.write().await;
        let Some(entry) = inner.entries.get_mut(id) else {
            return Ok(UpdateOutcome::Missing);
        };

        let message = &mut entry.message;
        if !guard.admits(message.password_hash.as_ref()) {
            return Ok(UpdateOutcome::Stale);
        }

        patch.content.apply(&mut message.content);
        patch.password_hash.apply(&mut message.password_hash);
        patch.hint.apply(&mut message.hint);
        message.updated_at = OffsetDateTime::now_utc();

        Ok(UpdateOutcome::Updated(message.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.inner.write().await.entries.remove(id).is_some())
    }

    async fn delete_by_project(&self, project_id: &str) -> Result<Vec<String>> {
        let mut inner = self.inner.write().await;
        let ids: Vec<String> =
            inner.entries.values().filter(|e| e.message.project_id == project_id).map(|e| e.message.id.clone()).collect();
        for id in &ids {
            inner.entries.remove(id);
        }
        Ok(ids)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
