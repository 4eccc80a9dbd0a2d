use crate::domain::message::{Message, PasswordDigest};
use serde_json::Value;
use time::OffsetDateTime;

#[derive(Debug, sqlx::FromRow)]
pub struct MessageRecord {
    pub(crate) id: String,
    pub(crate) project_id: String,
    pub(crate) content: Option<Value>,
    pub(crate) password_hash: Option<String>,
    pub(crate) hint: Option<String>,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            project_id: record.project_id,
            content: record.content,
            password_hash: record.password_hash.map(PasswordDigest::new),
            hint: record.hint,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
