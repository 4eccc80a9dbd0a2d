use crate::adapters::message_store::MessageStore;
use crate::domain::access::{Caller, Decision, Operation, decide};
use crate::domain::message::{
    FieldUpdate, HashGuard, Message, MessageContent, MessageDraft, MessageInfo, MessagePatch, MessageUpdate,
    NewMessage, UpdateOutcome,
};
use crate::error::{AppError, Result};
use crate::services::credential_service::CredentialService;
use opentelemetry::{KeyValue, global, metrics::Counter};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub(crate) struct Metrics {
    pub(crate) created_total: Counter<u64>,
    pub(crate) access_denied_total: Counter<u64>,
    pub(crate) password_rotations_total: Counter<u64>,
    pub(crate) deleted_total: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("letterbox-server");
        Self {
            created_total: meter
                .u64_counter("letterbox_messages_created_total")
                .with_description("Total messages created")
                .build(),
            access_denied_total: meter
                .u64_counter("letterbox_access_denied_total")
                .with_description("Requests refused by the access policy")
                .build(),
            password_rotations_total: meter
                .u64_counter("letterbox_password_rotations_total")
                .with_description("Successful password rotations")
                .build(),
            deleted_total: meter
                .u64_counter("letterbox_messages_deleted_total")
                .with_description("Total messages deleted")
                .build(),
        }
    }
}

/// Content access for both personas.
///
/// Every operation takes the [`Caller`] and runs the same decision table from
/// [`crate::domain::access`]; only the table knows how admins and anonymous
/// callers differ.
#[derive(Clone, Debug)]
pub struct MessageService {
    store: Arc<dyn MessageStore>,
    credentials: CredentialService,
    metrics: Metrics,
}

impl MessageService {
    #[must_use]
    pub fn new(store: Arc<dyn MessageStore>, credentials: CredentialService) -> Self {
        Self { store, credentials, metrics: Metrics::new() }
    }

    /// Returns the public metadata of a message.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the message does not exist.
    #[tracing::instrument(err(level = "warn"), skip(self, caller, id), fields(message_id = %id))]
    pub async fn get_info(&self, caller: &Caller, id: &str) -> Result<MessageInfo> {
        let message = self.resolve(caller, id).await?;
        self.authorize(caller, Operation::ViewMeta, &message).await?;
        Ok(message.info())
    }

    /// Lists the metadata of every message in the caller's project, oldest first.
    ///
    /// # Errors
    /// Returns `AppError::Unauthorized` for anonymous callers.
    #[tracing::instrument(err(level = "warn"), skip(self, caller))]
    pub async fn list(&self, caller: &Caller) -> Result<Vec<MessageInfo>> {
        let project_id = self.manage_scope(caller)?;
        let messages = self.store.list_by_project(project_id).await?;
        Ok(messages.iter().map(Message::info).collect())
    }

    /// Creates a message in the caller's project, hashing the initial password if one is given.
    ///
    /// # Errors
    /// Returns `AppError::Unauthorized` for anonymous callers.
    /// Returns `AppError::BadRequest` for an empty ID or password.
    /// Returns `AppError::Conflict` if the ID is taken.
    #[tracing::instrument(
        err(level = "warn"),
        skip(self, caller, new),
        fields(message_id = tracing::field::Empty, protected = new.initial_password.is_some())
    )]
    pub async fn create(&self, caller: &Caller, new: NewMessage) -> Result<Message> {
        let project_id = self.manage_scope(caller)?.to_string();

        let id = match new.id {
            Some(id) if id.trim().is_empty() => return Err(AppError::BadRequest("Message ID must not be empty".into())),
            Some(id) => id,
            None => Uuid::new_v4().to_string(),
        };
        tracing::Span::current().record("message_id", tracing::field::display(&id));

        let password_hash = match new.initial_password {
            Some(password) => Some(self.credentials.hash(require_password(&password)?).await?),
            None => None,
        };

        let message = self
            .store
            .insert(MessageDraft { id, project_id, content: new.content, password_hash, hint: new.hint })
            .await?;

        tracing::info!("Message created");
        self.metrics.created_total.add(1, &[]);
        Ok(message)
    }

    /// Returns the content of a message.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the message does not exist.
    /// Returns `AppError::Unauthorized` if the message is protected and the password is missing or wrong.
    #[tracing::instrument(err(level = "warn"), skip(self, caller, id), fields(message_id = %id))]
    pub async fn read(&self, caller: &Caller, id: &str) -> Result<MessageContent> {
        let message = self.resolve(caller, id).await?;
        self.authorize(caller, Operation::Read, &message).await?;
        Ok(message.into_content())
    }

    /// Replaces the content of a message.
    ///
    /// The write only lands if the password hash is still the one that was verified.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the message does not exist or vanished mid-update.
    /// Returns `AppError::Unauthorized` if the password is missing, wrong, or was rotated concurrently.
    #[tracing::instrument(err(level = "warn"), skip(self, caller, id, content), fields(message_id = %id))]
    pub async fn update_content(&self, caller: &Caller, id: &str, content: Value) -> Result<MessageContent> {
        let message = self.resolve(caller, id).await?;
        self.authorize(caller, Operation::UpdateContent, &message).await?;

        let patch = MessagePatch { content: FieldUpdate::content(content), ..MessagePatch::default() };
        let updated = self.apply(id, guard_for(caller, &message), patch).await?;

        tracing::debug!("Message content updated");
        Ok(updated.into_content())
    }

    /// Replaces the password of a protected message, optionally replacing the hint.
    ///
    /// Anonymous callers prove the current password; a message without one
    /// cannot gain a password through this path.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the message does not exist.
    /// Returns `AppError::InvalidState` if an anonymous caller targets an open message.
    /// Returns `AppError::Unauthorized` if the current password is missing or wrong.
    /// Returns `AppError::BadRequest` if the new password is empty.
    #[tracing::instrument(
        err(level = "warn"),
        skip(self, caller, id, new_password, new_hint),
        fields(message_id = %id)
    )]
    pub async fn rotate_password(
        &self,
        caller: &Caller,
        id: &str,
        new_password: &str,
        new_hint: Option<String>,
    ) -> Result<()> {
        let message = self.resolve(caller, id).await?;
        let new_password = require_password(new_password)?;
        self.authorize(caller, Operation::RotatePassword, &message).await?;

        let password_hash = self.credentials.hash(new_password).await?;
        let patch = MessagePatch {
            password_hash: FieldUpdate::Set(password_hash),
            hint: new_hint.map_or(FieldUpdate::Keep, FieldUpdate::Set),
            ..MessagePatch::default()
        };
        self.apply(id, guard_for(caller, &message), patch).await?;

        tracing::info!("Message password rotated");
        self.metrics.password_rotations_total.add(1, &[]);
        Ok(())
    }

    /// Applies an admin update. Omitted fields are kept, cleared fields are removed.
    ///
    /// Clearing the password makes the message open.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the message does not exist in the caller's project.
    /// Returns `AppError::Unauthorized` for anonymous callers.
    /// Returns `AppError::BadRequest` if the new password is empty.
    #[tracing::instrument(err(level = "warn"), skip(self, caller, id, update), fields(message_id = %id))]
    pub async fn update(&self, caller: &Caller, id: &str, update: MessageUpdate) -> Result<Message> {
        self.manage_scope(caller)?;
        let message = self.resolve(caller, id).await?;
        let password = update.password.try_map(|p| require_password(&p).map(str::to_owned))?;
        self.authorize(caller, Operation::Manage, &message).await?;

        let password_hash = match password {
            FieldUpdate::Set(p) => FieldUpdate::Set(self.credentials.hash(&p).await?),
            FieldUpdate::Clear => FieldUpdate::Clear,
            FieldUpdate::Keep => FieldUpdate::Keep,
        };
        let patch = MessagePatch { content: update.content, password_hash, hint: update.hint };

        let updated = self.apply(id, HashGuard::Any, patch).await?;
        tracing::info!(protected = updated.is_protected(), "Message updated");
        Ok(updated)
    }

    /// Deletes a single message of the caller's project.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the message does not exist in the caller's project.
    #[tracing::instrument(err(level = "warn"), skip(self, caller, id), fields(message_id = %id))]
    pub async fn delete(&self, caller: &Caller, id: &str) -> Result<()> {
        self.manage_scope(caller)?;
        let message = self.resolve(caller, id).await?;
        self.authorize(caller, Operation::Manage, &message).await?;

        if !self.store.delete(id).await? {
            return Err(AppError::NotFound);
        }

        tracing::info!("Message deleted");
        self.metrics.deleted_total.add(1, &[]);
        Ok(())
    }

    /// Deletes every message of the caller's project and returns their IDs.
    ///
    /// # Errors
    /// Returns `AppError::Unauthorized` for anonymous callers.
    #[tracing::instrument(err(level = "warn"), skip(self, caller), fields(deleted = tracing::field::Empty))]
    pub async fn delete_for_project(&self, caller: &Caller) -> Result<Vec<String>> {
        let project_id = self.manage_scope(caller)?;
        let ids = self.store.delete_by_project(project_id).await?;

        tracing::Span::current().record("deleted", ids.len());
        tracing::info!("Project messages deleted");
        self.metrics.deleted_total.add(ids.len() as u64, &[]);
        Ok(ids)
    }

    /// Checks the caller's password ahead of side operations such as image uploads.
    ///
    /// Open messages always pass. For protected messages a missing password is
    /// an error and a wrong one yields `false`.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if the message does not exist.
    /// Returns `AppError::Unauthorized` if the message is protected and no password was supplied.
    #[tracing::instrument(err(level = "warn"), skip(self, caller, id), fields(message_id = %id))]
    pub async fn verify_password(&self, caller: &Caller, id: &str) -> Result<bool> {
        let message = self.resolve(caller, id).await?;

        match decide(caller.persona(), Operation::VerifyPassword, message.is_protected()) {
            Decision::Allow => Ok(true),
            Decision::Deny(denial) => {
                self.record_denial(Operation::VerifyPassword);
                Err(denial.into())
            }
            Decision::ProvePassword => {
                let Some(password) = caller.password() else {
                    self.record_denial(Operation::VerifyPassword);
                    return Err(AppError::Unauthorized);
                };
                self.password_matches(password, &message).await
            }
        }
    }

    /// Loads a message the caller is allowed to address.
    ///
    /// Admins only see messages of their own project. When an anonymous caller
    /// brings a password for an ID that does not exist, a decoy comparison runs
    /// so the miss costs as much as a wrong password.
    async fn resolve(&self, caller: &Caller, id: &str) -> Result<Message> {
        let found = self.store.find_by_id(id).await?;

        match (found, caller) {
            (Some(message), Caller::Admin { project_id }) if message.project_id != *project_id => {
                Err(AppError::NotFound)
            }
            (Some(message), _) => Ok(message),
            (None, _) => {
                if let Some(password) = caller.password() {
                    self.credentials.compare_decoy(password).await;
                }
                Err(AppError::NotFound)
            }
        }
    }

    async fn authorize(&self, caller: &Caller, operation: Operation, message: &Message) -> Result<()> {
        match decide(caller.persona(), operation, message.is_protected()) {
            Decision::Allow => Ok(()),
            Decision::Deny(denial) => {
                self.record_denial(operation);
                Err(denial.into())
            }
            Decision::ProvePassword => {
                let Some(password) = caller.password() else {
                    self.record_denial(operation);
                    return Err(AppError::Unauthorized);
                };
                if self.password_matches(password, message).await? {
                    Ok(())
                } else {
                    self.record_denial(operation);
                    Err(AppError::Unauthorized)
                }
            }
        }
    }

    async fn password_matches(&self, password: &str, message: &Message) -> Result<bool> {
        match &message.password_hash {
            Some(digest) => self.credentials.compare(password, digest).await,
            None => Ok(true),
        }
    }

    fn manage_scope<'a>(&self, caller: &'a Caller) -> Result<&'a str> {
        match (decide(caller.persona(), Operation::Manage, false), caller.project_id()) {
            (Decision::Allow, Some(project_id)) => Ok(project_id),
            _ => {
                self.record_denial(Operation::Manage);
                Err(AppError::Unauthorized)
            }
        }
    }

    async fn apply(&self, id: &str, guard: HashGuard, patch: MessagePatch) -> Result<Message> {
        match self.store.update(id, guard, patch).await? {
            UpdateOutcome::Updated(message) => Ok(message),
            UpdateOutcome::Missing => Err(AppError::NotFound),
            UpdateOutcome::Stale => {
                tracing::warn!("Password changed while the update was in flight");
                Err(AppError::Unauthorized)
            }
        }
    }

    fn record_denial(&self, operation: Operation) {
        self.metrics.access_denied_total.add(1, &[KeyValue::new("operation", operation.as_str())]);
    }
}

/// Admin writes are unconditional; anonymous writes are pinned to the hash that was verified.
fn guard_for(caller: &Caller, message: &Message) -> HashGuard {
    match caller {
        Caller::Admin { .. } => HashGuard::Any,
        Caller::Anonymous { .. } => HashGuard::Unchanged(message.password_hash.clone()),
    }
}

fn require_password(password: &str) -> Result<&str> {
    if password.is_empty() {
        return Err(AppError::BadRequest("Password must not be empty".into()));
    }
    Ok(password)
}
