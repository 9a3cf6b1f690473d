use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EntitiesError, Result};

/// The kind of object a permission can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Entry,
    Folder,
    Upload,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Entry => "entry",
            ObjectKind::Folder => "folder",
            ObjectKind::Upload => "upload",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "entry" => Ok(ObjectKind::Entry),
            "folder" => Ok(ObjectKind::Folder),
            "upload" => Ok(ObjectKind::Upload),
            other => Err(EntitiesError::UnknownObjectKind(other.to_string())),
        }
    }
}

/// Reference to the object side of a grant: an entry, a folder, or a draft
/// upload. Exactly one of the three, enforced by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum AuthObject {
    Entry(i64),
    Folder(i64),
    Upload(i64),
}

impl AuthObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            AuthObject::Entry(_) => ObjectKind::Entry,
            AuthObject::Folder(_) => ObjectKind::Folder,
            AuthObject::Upload(_) => ObjectKind::Upload,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            AuthObject::Entry(id) | AuthObject::Folder(id) | AuthObject::Upload(id) => *id,
        }
    }

    pub fn from_kind(kind: ObjectKind, id: i64) -> Self {
        match kind {
            ObjectKind::Entry => AuthObject::Entry(id),
            ObjectKind::Folder => AuthObject::Folder(id),
            ObjectKind::Upload => AuthObject::Upload(id),
        }
    }
}

impl std::fmt::Display for AuthObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind().as_str(), self.id())
    }
}

/// A catalog entry: a strain, plasmid, part, or seed record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Entry {
    pub id: i64,
    pub owner_email: String,
    pub name: String,
    pub record_type: String,
    pub created_at: DateTime<Utc>,
}

/// A collection of entries. When `propagate_permissions` is set, every grant
/// or revocation performed on the folder is mirrored onto its current
/// contents.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Folder {
    pub id: i64,
    pub owner_email: String,
    pub name: String,
    pub propagate_permissions: bool,
    pub created_at: DateTime<Utc>,
}

/// A draft bulk upload owned by the depositing account.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Upload {
    pub id: i64,
    pub owner_email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
