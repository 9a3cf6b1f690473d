//! Group repository: membership and the well-known group bootstrap.

use chrono::{DateTime, Utc};
use entities::{Group, GroupType};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Result, Store};

const GROUP_COLUMNS: &str =
    "id, uuid, label, description, group_type, owner_email, created_at";

pub(crate) fn row_to_group(row: SqliteRow) -> Result<Group> {
    let group_type: String = row.try_get("group_type")?;
    Ok(Group {
        id: row.try_get("id")?,
        uuid: row.try_get("uuid")?,
        label: row.try_get("label")?,
        description: row.try_get("description")?,
        group_type: GroupType::parse(&group_type)?,
        owner_email: row.try_get("owner_email")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

impl Store {
    /// Create a group with a freshly generated UUID.
    pub async fn create_group(
        &self,
        label: &str,
        description: &str,
        group_type: GroupType,
        owner_email: Option<&str>,
    ) -> Result<Group> {
        let uuid = Uuid::new_v4().to_string();
        let created_at = Utc::now();

        let id = sqlx::query(
            "INSERT INTO groups (uuid, label, description, group_type, owner_email, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&uuid)
        .bind(label)
        .bind(description)
        .bind(group_type.as_str())
        .bind(owner_email)
        .bind(created_at)
        .execute(self.pool())
        .await?
        .last_insert_rowid();

        info!("Created {} group '{}' ({})", group_type.as_str(), label, id);

        Ok(Group {
            id,
            uuid,
            label: label.to_string(),
            description: description.to_string(),
            group_type,
            owner_email: owner_email.map(str::to_string),
            created_at,
        })
    }

    pub async fn group_by_id(&self, id: i64) -> Result<Option<Group>> {
        let row = sqlx::query(&format!("SELECT {GROUP_COLUMNS} FROM groups WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(row_to_group).transpose()
    }

    pub async fn group_by_uuid(&self, uuid: &str) -> Result<Option<Group>> {
        let row = sqlx::query(&format!("SELECT {GROUP_COLUMNS} FROM groups WHERE uuid = ?"))
            .bind(uuid)
            .fetch_optional(self.pool())
            .await?;
        row.map(row_to_group).transpose()
    }

    /// Idempotent get-or-create keyed on the UUID uniqueness constraint.
    ///
    /// Safe under concurrent first use: a losing inserter falls through to
    /// the select and observes the winner's row. This is how the well-known
    /// public and everyone groups come into existence.
    pub async fn get_or_create_group_by_uuid(
        &self,
        uuid: &str,
        label: &str,
        group_type: GroupType,
    ) -> Result<Group> {
        let inserted = sqlx::query(
            "INSERT INTO groups (uuid, label, description, group_type, owner_email, created_at) \
             VALUES (?, ?, '', ?, NULL, ?) \
             ON CONFLICT(uuid) DO NOTHING",
        )
        .bind(uuid)
        .bind(label)
        .bind(group_type.as_str())
        .bind(Utc::now())
        .execute(self.pool())
        .await?
        .rows_affected();

        if inserted > 0 {
            info!("Created well-known group '{}' ({})", label, uuid);
        }

        let row = sqlx::query(&format!("SELECT {GROUP_COLUMNS} FROM groups WHERE uuid = ?"))
            .bind(uuid)
            .fetch_one(self.pool())
            .await?;
        row_to_group(row)
    }

    /// Add an account to a group. Already-present memberships are a no-op.
    pub async fn add_group_member(&self, group_id: i64, account_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO group_members (group_id, account_id) VALUES (?, ?)")
            .bind(group_id)
            .bind(account_id)
            .execute(self.pool())
            .await?;
        debug!("Account {} added to group {}", account_id, group_id);
        Ok(())
    }

    pub async fn remove_group_member(&self, group_id: i64, account_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM group_members WHERE group_id = ? AND account_id = ?")
            .bind(group_id)
            .bind(account_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Ids of every group the account currently belongs to. One level only;
    /// groups do not nest.
    pub async fn group_ids_for_account(&self, account_id: i64) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT group_id FROM group_members WHERE account_id = ? ORDER BY group_id",
        )
        .bind(account_id)
        .fetch_all(self.pool())
        .await?;
        Ok(ids)
    }

    pub async fn member_count(&self, group_id: i64) -> Result<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM group_members WHERE group_id = ?")
                .bind(group_id)
                .fetch_one(self.pool())
                .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entities::PUBLIC_GROUP_UUID;

    #[tokio::test]
    async fn test_group_round_trip() {
        let store = Store::in_memory().await.unwrap();
        let group = store
            .create_group("lab", "the lab", GroupType::Private, Some("pi@example.org"))
            .await
            .unwrap();

        let fetched = store.group_by_id(group.id).await.unwrap().unwrap();
        assert_eq!(fetched.label, "lab");
        assert_eq!(fetched.group_type, GroupType::Private);
        assert_eq!(fetched.owner_email.as_deref(), Some("pi@example.org"));

        let by_uuid = store.group_by_uuid(&group.uuid).await.unwrap().unwrap();
        assert_eq!(by_uuid.id, group.id);
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let store = Store::in_memory().await.unwrap();
        let first = store
            .get_or_create_group_by_uuid(PUBLIC_GROUP_UUID, "Public", GroupType::Public)
            .await
            .unwrap();
        let second = store
            .get_or_create_group_by_uuid(PUBLIC_GROUP_UUID, "Public", GroupType::Public)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.is_public_group());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM groups WHERE uuid = ?")
            .bind(PUBLIC_GROUP_UUID)
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_membership() {
        let store = Store::in_memory().await.unwrap();
        let account = store
            .create_account("x@example.org", "X", false)
            .await
            .unwrap();
        let group = store
            .create_group("g", "", GroupType::Private, None)
            .await
            .unwrap();

        store.add_group_member(group.id, account.id).await.unwrap();
        // Duplicate add is a no-op.
        store.add_group_member(group.id, account.id).await.unwrap();

        assert_eq!(
            store.group_ids_for_account(account.id).await.unwrap(),
            vec![group.id]
        );
        assert_eq!(store.member_count(group.id).await.unwrap(), 1);

        store
            .remove_group_member(group.id, account.id)
            .await
            .unwrap();
        assert!(store
            .group_ids_for_account(account.id)
            .await
            .unwrap()
            .is_empty());
    }
}
