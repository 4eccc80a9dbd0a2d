use crate::error::AppError;
use std::fmt;

/// Who is calling, and what they brought with them.
///
/// Admin callers have already passed the gateway trust check upstream and are
/// scoped to a single project. Anonymous callers may carry a plaintext password.
#[derive(Clone)]
pub enum Caller {
    Admin { project_id: String },
    Anonymous { password: Option<String> },
}

impl Caller {
    #[must_use]
    pub fn admin(project_id: impl Into<String>) -> Self {
        Self::Admin { project_id: project_id.into() }
    }

    #[must_use]
    pub const fn anonymous(password: Option<String>) -> Self {
        Self::Anonymous { password }
    }

    #[must_use]
    pub const fn persona(&self) -> Persona {
        match self {
            Self::Admin { .. } => Persona::Admin,
            Self::Anonymous { .. } => Persona::Anonymous,
        }
    }

    /// The supplied password, if any. Empty strings count as absent.
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        match self {
            Self::Anonymous { password: Some(p) } if !p.is_empty() => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Self::Admin { project_id } => Some(project_id),
            Self::Anonymous { .. } => None,
        }
    }
}

impl fmt::Debug for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin { project_id } => f.debug_struct("Admin").field("project_id", project_id).finish(),
            Self::Anonymous { password } => {
                f.debug_struct("Anonymous").field("password", &password.as_ref().map(|_| "..")).finish()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    Admin,
    Anonymous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ViewMeta,
    Read,
    UpdateContent,
    RotatePassword,
    VerifyPassword,
    /// Create, list, overwrite and delete.
    Manage,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ViewMeta => "view_meta",
            Self::Read => "read",
            Self::UpdateContent => "update_content",
            Self::RotatePassword => "rotate_password",
            Self::VerifyPassword => "verify_password",
            Self::Manage => "manage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// The caller must present a password that matches the stored hash.
    ProvePassword,
    Deny(Denial),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Unauthorized,
    InvalidState,
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthorized => Self::Unauthorized,
            Denial::InvalidState => Self::InvalidState("Message has no password set".into()),
        }
    }
}

/// The access table shared by both personas.
///
/// `protected` is whether the message currently stores a password hash.
#[must_use]
pub const fn decide(persona: Persona, operation: Operation, protected: bool) -> Decision {
    use Operation::{Manage, Read, RotatePassword, UpdateContent, VerifyPassword, ViewMeta};

    match (persona, operation, protected) {
        (_, ViewMeta, _) | (Persona::Admin, _, _) => Decision::Allow,
        (Persona::Anonymous, Manage, _) => Decision::Deny(Denial::Unauthorized),
        (Persona::Anonymous, Read | UpdateContent | VerifyPassword, false) => Decision::Allow,
        (Persona::Anonymous, Read | UpdateContent | VerifyPassword | RotatePassword, true) => Decision::ProvePassword,
        // Turning an open message into a protected one is an admin action.
        (Persona::Anonymous, RotatePassword, false) => Decision::Deny(Denial::InvalidState),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_OPS: [Operation; 6] = [
        Operation::ViewMeta,
        Operation::Read,
        Operation::UpdateContent,
        Operation::RotatePassword,
        Operation::VerifyPassword,
        Operation::Manage,
    ];

    #[test]
    fn test_view_meta_always_allowed() {
        for persona in [Persona::Admin, Persona::Anonymous] {
            for protected in [false, true] {
                assert_eq!(decide(persona, Operation::ViewMeta, protected), Decision::Allow);
            }
        }
    }

    #[test]
    fn test_admin_bypasses_passwords() {
        for op in ALL_OPS {
            assert_eq!(decide(Persona::Admin, op, true), Decision::Allow, "{op:?}");
            assert_eq!(decide(Persona::Admin, op, false), Decision::Allow, "{op:?}");
        }
    }

    #[test]
    fn test_anonymous_open_message() {
        assert_eq!(decide(Persona::Anonymous, Operation::Read, false), Decision::Allow);
        assert_eq!(decide(Persona::Anonymous, Operation::UpdateContent, false), Decision::Allow);
        assert_eq!(decide(Persona::Anonymous, Operation::VerifyPassword, false), Decision::Allow);
        assert_eq!(
            decide(Persona::Anonymous, Operation::RotatePassword, false),
            Decision::Deny(Denial::InvalidState)
        );
    }

    #[test]
    fn test_anonymous_protected_message() {
        for op in [Operation::Read, Operation::UpdateContent, Operation::VerifyPassword, Operation::RotatePassword] {
            assert_eq!(decide(Persona::Anonymous, op, true), Decision::ProvePassword, "{op:?}");
        }
    }

    #[test]
    fn test_anonymous_cannot_manage() {
        for protected in [false, true] {
            assert_eq!(decide(Persona::Anonymous, Operation::Manage, protected), Decision::Deny(Denial::Unauthorized));
        }
    }

    #[test]
    fn test_caller_password_ignores_empty() {
        assert_eq!(Caller::anonymous(Some(String::new())).password(), None);
        assert_eq!(Caller::anonymous(Some("abc".into())).password(), Some("abc"));
        assert_eq!(Caller::admin("p1").password(), None);
    }

    #[test]
    fn test_caller_debug_redacts_password() {
        let rendered = format!("{:?}", Caller::anonymous(Some("hunter2".into())));
        assert!(!rendered.contains("hunter2"));
    }
}
