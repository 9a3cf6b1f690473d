use serde::{Deserialize, Serialize};

use crate::error::{EntitiesError, Result};
use crate::object::{AuthObject, ObjectKind};

/// The kind of subject a permission can be granted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Account,
    Group,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Account => "account",
            SubjectKind::Group => "group",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "account" => Ok(SubjectKind::Account),
            "group" => Ok(SubjectKind::Group),
            other => Err(EntitiesError::UnknownSubjectKind(other.to_string())),
        }
    }
}

/// The "who" of a grant: a single account or a single group, never both and
/// never neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Subject {
    Account(i64),
    Group(i64),
}

impl Subject {
    pub fn kind(&self) -> SubjectKind {
        match self {
            Subject::Account(_) => SubjectKind::Account,
            Subject::Group(_) => SubjectKind::Group,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Subject::Account(id) | Subject::Group(id) => *id,
        }
    }

    pub fn from_kind(kind: SubjectKind, id: i64) -> Self {
        match kind {
            SubjectKind::Account => Subject::Account(id),
            SubjectKind::Group => Subject::Group(id),
        }
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind().as_str(), self.id())
    }
}

/// A stored permission record: one subject, one object, and the access flags.
///
/// No two grants may share the same (subject, object, can_read, can_write);
/// the store enforces this with a uniqueness constraint and creation is
/// insert-if-absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub id: i64,
    pub subject: Subject,
    pub object: AuthObject,
    pub can_read: bool,
    pub can_write: bool,
}

/// Caller-facing description of a desired grant, used only at the boundary.
///
/// The engine resolves the kind/id pairs into concrete records before
/// touching the grant table. `display` carries the subject's display name on
/// the way out of "who has access" listings and is ignored on the way in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessPermission {
    pub object_kind: ObjectKind,
    pub object_id: i64,
    pub subject_kind: SubjectKind,
    pub subject_id: i64,
    pub can_read: bool,
    pub can_write: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl AccessPermission {
    pub fn new(object: AuthObject, subject: Subject, can_read: bool, can_write: bool) -> Self {
        Self {
            object_kind: object.kind(),
            object_id: object.id(),
            subject_kind: subject.kind(),
            subject_id: subject.id(),
            can_read,
            can_write,
            display: None,
        }
    }

    /// Shorthand for a read grant on an entry, the most common request shape.
    pub fn read_entry(entry_id: i64, subject: Subject) -> Self {
        Self::new(AuthObject::Entry(entry_id), subject, true, false)
    }

    pub fn object(&self) -> AuthObject {
        AuthObject::from_kind(self.object_kind, self.object_id)
    }

    pub fn subject(&self) -> Subject {
        Subject::from_kind(self.subject_kind, self.subject_id)
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_accessors() {
        let subject = Subject::Group(9);
        assert_eq!(subject.kind(), SubjectKind::Group);
        assert_eq!(subject.id(), 9);
        assert_eq!(Subject::from_kind(SubjectKind::Group, 9), subject);
    }

    #[test]
    fn test_access_permission_round_trip() {
        let permission = AccessPermission::new(
            AuthObject::Folder(3),
            Subject::Account(12),
            true,
            true,
        );
        assert_eq!(permission.object(), AuthObject::Folder(3));
        assert_eq!(permission.subject(), Subject::Account(12));
        assert!(permission.can_read);
        assert!(permission.can_write);
        assert!(permission.display.is_none());
    }

    #[test]
    fn test_read_entry_shorthand() {
        let permission = AccessPermission::read_entry(5, Subject::Group(2));
        assert_eq!(permission.object(), AuthObject::Entry(5));
        assert!(permission.can_read);
        assert!(!permission.can_write);
    }

    #[test]
    fn test_serde_tagged_subject() {
        let subject = Subject::Account(4);
        let json = serde_json::to_string(&subject).unwrap();
        assert_eq!(json, r#"{"kind":"account","id":4}"#);
        let parsed: Subject = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, subject);
    }
}
