use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EntitiesError, Result};

/// Well-known UUID of the public group. A read grant held by this group makes
/// an object visible to every user of the registry.
pub const PUBLIC_GROUP_UUID: &str = "8746a64b-abc8-4125-87fa-f622b3ba7e43";

/// Well-known UUID of the group every registered account implicitly belongs to.
pub const EVERYONE_GROUP_UUID: &str = "74bef250-d1fa-43e2-8d6d-e82b60b4b069";

/// Classification of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    /// Created and managed by a regular account for sharing with collaborators.
    Private,
    /// Administrator-managed group visible to all users.
    Public,
    /// The system group containing every registered account.
    Everyone,
}

impl GroupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupType::Private => "private",
            GroupType::Public => "public",
            GroupType::Everyone => "everyone",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "private" => Ok(GroupType::Private),
            "public" => Ok(GroupType::Public),
            "everyone" => Ok(GroupType::Everyone),
            other => Err(EntitiesError::UnknownGroupType(other.to_string())),
        }
    }
}

/// A named collection of accounts.
///
/// The UUID is the stable external key; the two well-known groups use fixed
/// UUIDs so that lazy creation can rely on the uniqueness constraint rather
/// than an in-memory flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub uuid: String,
    pub label: String,
    pub description: String,
    pub group_type: GroupType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// Whether this is the well-known public group.
    pub fn is_public_group(&self) -> bool {
        self.uuid.eq_ignore_ascii_case(PUBLIC_GROUP_UUID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_type_round_trip() {
        for group_type in [GroupType::Private, GroupType::Public, GroupType::Everyone] {
            assert_eq!(GroupType::parse(group_type.as_str()).unwrap(), group_type);
        }
    }

    #[test]
    fn test_unknown_group_type_rejected() {
        assert!(GroupType::parse("protected").is_err());
    }

    #[test]
    fn test_public_group_detection() {
        let group = Group {
            id: 1,
            uuid: PUBLIC_GROUP_UUID.to_string(),
            label: "Public".to_string(),
            description: String::new(),
            group_type: GroupType::Public,
            owner_email: None,
            created_at: Utc::now(),
        };
        assert!(group.is_public_group());
    }
}
