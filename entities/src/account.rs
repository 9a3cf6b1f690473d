use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user of the registry.
///
/// The email address is the stable login key and the identifier callers pass
/// to the authorization engine. The numeric id is the database rowid and is
/// what grants reference.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Case-insensitive email comparison, matching how logins are keyed.
    pub fn matches_email(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_match_is_case_insensitive() {
        let account = Account {
            id: 1,
            email: "alice@example.org".to_string(),
            full_name: "Alice".to_string(),
            is_admin: false,
            created_at: Utc::now(),
        };

        assert!(account.matches_email("alice@example.org"));
        assert!(account.matches_email("Alice@Example.Org"));
        assert!(!account.matches_email("bob@example.org"));
    }
}
