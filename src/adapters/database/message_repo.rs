use crate::adapters::database::DbPool;
use crate::adapters::database::records::MessageRecord;
use crate::adapters::message_store::MessageStore;
use crate::domain::message::{HashGuard, Message, MessageDraft, MessagePatch, UpdateOutcome};
use crate::error::{AppError, Result};
use async_trait::async_trait;

const COLUMNS: &str = "id, project_id, content, password_hash, hint, created_at, updated_at";

#[derive(Clone, Debug)]
pub struct MessageRepository {
    pool: DbPool,
}

impl MessageRepository {
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for MessageRepository {
    #[tracing::instrument(level = "debug", skip(self, draft), fields(message_id = %draft.id), err)]
    async fn insert(&self, draft: MessageDraft) -> Result<Message> {
        let result = sqlx::query_as::<_, MessageRecord>(&format!(
            r"
            INSERT INTO messages (id, project_id, content, password_hash, hint)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "
        ))
        .bind(&draft.id)
        .bind(&draft.project_id)
        .bind(&draft.content)
        .bind(draft.password_hash.as_ref().map(|h| h.as_str()))
        .bind(&draft.hint)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(record) => Ok(record.into()),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("23505") => {
                // Unique violation on the primary key
                Err(AppError::Conflict(format!("Message {} already exists", draft.id)))
            }
            Err(e) => Err(AppError::Database(e)),
        }
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn find_by_id(&self, id: &str) -> Result<Option<Message>> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!("SELECT {COLUMNS} FROM messages WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record.map(Into::into))
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn list_by_project(&self, project_id: &str) -> Result<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            r"
            SELECT {COLUMNS}
            FROM messages
            WHERE project_id = $1
            ORDER BY created_at ASC, id ASC
            "
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Into::into).collect())
    }

    #[tracing::instrument(level = "debug", skip(self, guard, patch), err)]
    async fn update(&self, id: &str, guard: HashGuard, patch: MessagePatch) -> Result<UpdateOutcome> {
        let (unguarded, expected) = match guard {
            HashGuard::Any => (true, None),
            HashGuard::Unchanged(expected) => (false, expected),
        };
        let (set_content, content) = patch.content.into_parts();
        let (set_password, password_hash) = patch.password_hash.into_parts();
        let (set_hint, hint) = patch.hint.into_parts();

        let mut tx = self.pool.begin().await?;

        // The guard is part of the predicate so verify-then-write is a single atomic step.
        let updated = sqlx::query_as::<_, MessageRecord>(&format!(
            r"
            UPDATE messages SET
                content = CASE WHEN $2 THEN $3 ELSE content END,
                password_hash = CASE WHEN $4 THEN $5 ELSE password_hash END,
                hint = CASE WHEN $6 THEN $7 ELSE hint END,
                updated_at = NOW()
            WHERE id = $1
              AND ($8 OR password_hash IS NOT DISTINCT FROM $9)
            RETURNING {COLUMNS}
            "
        ))
        .bind(id)
        .bind(set_content)
        .bind(content)
        .bind(set_password)
        .bind(password_hash.as_ref().map(|h| h.as_str().to_owned()))
        .bind(set_hint)
        .bind(hint)
        .bind(unguarded)
        .bind(expected.as_ref().map(|h| h.as_str().to_owned()))
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = if let Some(record) = updated {
            UpdateOutcome::Updated(record.into())
        } else {
            let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM messages WHERE id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
            if exists { UpdateOutcome::Stale } else { UpdateOutcome::Missing }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn delete_by_project(&self, project_id: &str) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>("DELETE FROM messages WHERE project_id = $1 RETURNING id")
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
