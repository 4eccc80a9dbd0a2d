use crate::domain::message::{HashGuard, Message, MessageDraft, MessagePatch, UpdateOutcome};
use crate::error::Result;
use async_trait::async_trait;

/// Persistence for message records.
///
/// Implementations must apply `update` atomically: the guard is evaluated
/// against the row as it is being written, not as it was last read.
#[async_trait]
pub trait MessageStore: Send + Sync + std::fmt::Debug + 'static {
    /// Inserts a new record.
    ///
    /// # Errors
    /// Returns `AppError::Conflict` if the ID is already taken.
    async fn insert(&self, draft: MessageDraft) -> Result<Message>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Message>>;

    /// Returns every message of a project, oldest first.
    async fn list_by_project(&self, project_id: &str) -> Result<Vec<Message>>;

    /// Applies `patch` if the stored password hash satisfies `guard`, refreshing `updated_at`.
    async fn update(&self, id: &str, guard: HashGuard, patch: MessagePatch) -> Result<UpdateOutcome>;

    /// Returns `false` if nothing was deleted.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Deletes every message of a project and returns the deleted IDs.
    async fn delete_by_project(&self, project_id: &str) -> Result<Vec<String>>;

    async fn ping(&self) -> Result<()>;
}
