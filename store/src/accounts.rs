//! Account repository: the identity side of authorization requests.

use chrono::Utc;
use entities::Account;
use tracing::{debug, info};

use crate::{Result, Store};

impl Store {
    /// Register a new account. Email is the stable login key and must be
    /// unique (case-insensitive).
    pub async fn create_account(
        &self,
        email: &str,
        full_name: &str,
        is_admin: bool,
    ) -> Result<Account> {
        let created_at = Utc::now();
        let id = sqlx::query(
            "INSERT INTO accounts (email, full_name, is_admin, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(email)
        .bind(full_name)
        .bind(is_admin)
        .bind(created_at)
        .execute(self.pool())
        .await?
        .last_insert_rowid();

        info!("Created account {} ({})", email, id);

        Ok(Account {
            id,
            email: email.to_string(),
            full_name: full_name.to_string(),
            is_admin,
            created_at,
        })
    }

    pub async fn account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, email, full_name, is_admin, created_at FROM accounts WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(self.pool())
        .await?;
        Ok(account)
    }

    pub async fn account_by_id(&self, id: i64) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, email, full_name, is_admin, created_at FROM accounts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(account)
    }

    /// Whether the account with this email carries the administrator flag.
    /// Unknown emails are not administrators.
    pub async fn is_administrator(&self, email: &str) -> Result<bool> {
        let is_admin: Option<bool> =
            sqlx::query_scalar("SELECT is_admin FROM accounts WHERE email = ?")
                .bind(email)
                .fetch_optional(self.pool())
                .await?;

        if is_admin.is_none() {
            debug!("Administrator check for unknown account {}", email);
        }
        Ok(is_admin.unwrap_or(false))
    }
}
