use crate::domain::message::{Message, MessageContent, MessageInfo, MessageUpdate, NewMessage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

#[derive(Debug, Default, Deserialize)]
pub struct ReadMessage {
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContent {
    pub password: Option<String>,
    pub new_content: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePassword {
    pub current_password: String,
    pub new_password: String,
    pub new_hint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessage {
    pub content: Option<Value>,
    pub message_id: Option<String>,
    pub initial_password: Option<String>,
    pub hint: Option<String>,
}

impl From<CreateMessage> for NewMessage {
    fn from(body: CreateMessage) -> Self {
        Self {
            id: body.message_id,
            content: body.content.filter(|c| !c.is_null()),
            initial_password: body.initial_password,
            hint: body.hint,
        }
    }
}

/// Omitted fields are kept, `null` clears, a value replaces.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMessage {
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub content: Option<Option<Value>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub password: Option<Option<String>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub hint: Option<Option<String>>,
}

impl From<UpdateMessage> for MessageUpdate {
    fn from(body: UpdateMessage) -> Self {
        Self {
            content: body.content.map(|c| c.filter(|v| !v.is_null())).into(),
            password: body.password.into(),
            hint: body.hint.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageInfoResponse {
    pub id: String,
    pub hint: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<MessageInfo> for MessageInfoResponse {
    fn from(info: MessageInfo) -> Self {
        Self { id: info.id, hint: info.hint, created_at: info.created_at, updated_at: info.updated_at }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageContentResponse {
    pub id: String,
    pub content: Option<Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<MessageContent> for MessageContentResponse {
    fn from(content: MessageContent) -> Self {
        Self {
            id: content.id,
            content: content.content,
            created_at: content.created_at,
            updated_at: content.updated_at,
        }
    }
}

/// Admin view of a record. The password hash is reduced to a flag.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminMessageResponse {
    pub id: String,
    pub project_id: String,
    pub content: Option<Value>,
    pub hint: Option<String>,
    pub protected: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Message> for AdminMessageResponse {
    fn from(message: Message) -> Self {
        Self {
            protected: message.is_protected(),
            id: message.id,
            project_id: message.project_id,
            content: message.content,
            hint: message.hint,
            created_at: message.created_at,
            updated_at: message.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: usize,
}
