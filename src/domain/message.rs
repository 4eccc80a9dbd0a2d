use serde_json::Value;
use std::fmt;
use time::OffsetDateTime;

/// An Argon2id PHC string. Never serialized and redacted from `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    #[must_use]
    pub const fn new(phc: String) -> Self {
        Self(phc)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest(..)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection<'a> {
    Open,
    Protected(&'a PasswordDigest),
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub project_id: String,
    pub content: Option<Value>,
    pub password_hash: Option<PasswordDigest>,
    pub hint: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Message {
    #[must_use]
    pub fn protection(&self) -> Protection<'_> {
        self.password_hash.as_ref().map_or(Protection::Open, Protection::Protected)
    }

    #[must_use]
    pub const fn is_protected(&self) -> bool {
        self.password_hash.is_some()
    }

    #[must_use]
    pub fn info(&self) -> MessageInfo {
        MessageInfo {
            id: self.id.clone(),
            hint: self.hint.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    #[must_use]
    pub fn into_content(self) -> MessageContent {
        MessageContent { id: self.id, content: self.content, created_at: self.created_at, updated_at: self.updated_at }
    }
}

/// What anyone who can name the ID may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageInfo {
    pub id: String,
    pub hint: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageContent {
    pub id: String,
    pub content: Option<Value>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Requested change to a single field.
///
/// `Keep` leaves the stored value alone, `Clear` removes it and `Set` replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T> FieldUpdate<T> {
    #[must_use]
    pub const fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }

    /// Splits into the `(touched, new value)` pair used by storage backends.
    #[must_use]
    pub fn into_parts(self) -> (bool, Option<T>) {
        match self {
            Self::Keep => (false, None),
            Self::Clear => (true, None),
            Self::Set(value) => (true, Some(value)),
        }
    }

    pub fn apply(self, slot: &mut Option<T>) {
        match self {
            Self::Keep => {}
            Self::Clear => *slot = None,
            Self::Set(value) => *slot = Some(value),
        }
    }

    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<FieldUpdate<U>, E> {
        Ok(match self {
            Self::Keep => FieldUpdate::Keep,
            Self::Clear => FieldUpdate::Clear,
            Self::Set(value) => FieldUpdate::Set(f(value)?),
        })
    }
}

impl<T> From<Option<Option<T>>> for FieldUpdate<T> {
    fn from(value: Option<Option<T>>) -> Self {
        match value {
            None => Self::Keep,
            Some(None) => Self::Clear,
            Some(Some(v)) => Self::Set(v),
        }
    }
}

impl FieldUpdate<Value> {
    /// A JSON `null` document is stored as absent content.
    #[must_use]
    pub fn content(value: Value) -> Self {
        if value.is_null() { Self::Clear } else { Self::Set(value) }
    }
}

/// Admin request to create a message.
#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    pub id: Option<String>,
    pub content: Option<Value>,
    pub initial_password: Option<String>,
    pub hint: Option<String>,
}

/// Admin request to change a message.
#[derive(Debug, Clone, Default)]
pub struct MessageUpdate {
    pub content: FieldUpdate<Value>,
    pub password: FieldUpdate<String>,
    pub hint: FieldUpdate<String>,
}

/// A fully resolved record ready to be inserted.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub id: String,
    pub project_id: String,
    pub content: Option<Value>,
    pub password_hash: Option<PasswordDigest>,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MessagePatch {
    pub content: FieldUpdate<Value>,
    pub password_hash: FieldUpdate<PasswordDigest>,
    pub hint: FieldUpdate<String>,
}

impl MessagePatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.content.is_keep() && self.password_hash.is_keep() && self.hint.is_keep()
    }
}

/// Precondition on the stored password hash for a write.
///
/// `Unchanged` carries the hash state that was verified before the write; the
/// write only lands if the row still holds exactly that state.
#[derive(Debug, Clone)]
pub enum HashGuard {
    Any,
    Unchanged(Option<PasswordDigest>),
}

impl HashGuard {
    #[must_use]
    pub fn admits(&self, current: Option<&PasswordDigest>) -> bool {
        match self {
            Self::Any => true,
            Self::Unchanged(expected) => expected.as_ref() == current,
        }
    }
}

#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    Updated(Message),
    Missing,
    Stale,
}
