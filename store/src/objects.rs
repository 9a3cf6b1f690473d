//! Entry, folder, and upload repositories: the object side of grants.

use chrono::Utc;
use entities::{Entry, Folder, Upload};
use tracing::{debug, info};

use crate::{Result, Store};

impl Store {
    pub async fn create_entry(
        &self,
        owner_email: &str,
        name: &str,
        record_type: &str,
    ) -> Result<Entry> {
        let created_at = Utc::now();
        let id = sqlx::query(
            "INSERT INTO entries (owner_email, name, record_type, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(owner_email)
        .bind(name)
        .bind(record_type)
        .bind(created_at)
        .execute(self.pool())
        .await?
        .last_insert_rowid();

        info!("Created {} entry '{}' ({})", record_type, name, id);

        Ok(Entry {
            id,
            owner_email: owner_email.to_string(),
            name: name.to_string(),
            record_type: record_type.to_string(),
            created_at,
        })
    }

    pub async fn entry_by_id(&self, id: i64) -> Result<Option<Entry>> {
        let entry = sqlx::query_as::<_, Entry>(
            "SELECT id, owner_email, name, record_type, created_at FROM entries WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(entry)
    }

    pub async fn create_folder(
        &self,
        owner_email: &str,
        name: &str,
        propagate_permissions: bool,
    ) -> Result<Folder> {
        let created_at = Utc::now();
        let id = sqlx::query(
            "INSERT INTO folders (owner_email, name, propagate_permissions, created_at) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(owner_email)
        .bind(name)
        .bind(propagate_permissions)
        .bind(created_at)
        .execute(self.pool())
        .await?
        .last_insert_rowid();

        info!("Created folder '{}' ({})", name, id);

        Ok(Folder {
            id,
            owner_email: owner_email.to_string(),
            name: name.to_string(),
            propagate_permissions,
            created_at,
        })
    }

    pub async fn folder_by_id(&self, id: i64) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(
            "SELECT id, owner_email, name, propagate_permissions, created_at \
             FROM folders WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(folder)
    }

    pub async fn set_propagate_permissions(&self, folder_id: i64, propagate: bool) -> Result<()> {
        sqlx::query("UPDATE folders SET propagate_permissions = ? WHERE id = ?")
            .bind(propagate)
            .bind(folder_id)
            .execute(self.pool())
            .await?;
        debug!("Folder {} propagate_permissions set to {}", folder_id, propagate);
        Ok(())
    }

    pub async fn add_to_folder(&self, folder_id: i64, entry_id: i64) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO folder_entries (folder_id, entry_id) VALUES (?, ?)")
            .bind(folder_id)
            .bind(entry_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn remove_from_folder(&self, folder_id: i64, entry_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM folder_entries WHERE folder_id = ? AND entry_id = ?")
            .bind(folder_id)
            .bind(entry_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Entry ids currently contained in the folder. Read at call time;
    /// propagation never caches this.
    pub async fn folder_contents(&self, folder_id: i64) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT entry_id FROM folder_entries WHERE folder_id = ? ORDER BY entry_id",
        )
        .bind(folder_id)
        .fetch_all(self.pool())
        .await?;
        Ok(ids)
    }

    pub async fn create_upload(&self, owner_email: &str, name: &str) -> Result<Upload> {
        let created_at = Utc::now();
        let id = sqlx::query("INSERT INTO uploads (owner_email, name, created_at) VALUES (?, ?, ?)")
            .bind(owner_email)
            .bind(name)
            .bind(created_at)
            .execute(self.pool())
            .await?
            .last_insert_rowid();

        info!("Created upload '{}' ({})", name, id);

        Ok(Upload {
            id,
            owner_email: owner_email.to_string(),
            name: name.to_string(),
            created_at,
        })
    }

    pub async fn upload_by_id(&self, id: i64) -> Result<Option<Upload>> {
        let upload = sqlx::query_as::<_, Upload>(
            "SELECT id, owner_email, name, created_at FROM uploads WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(upload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entry_round_trip() {
        let store = Store::in_memory().await.unwrap();
        let entry = store
            .create_entry("alice@example.org", "pUC19", "plasmid")
            .await
            .unwrap();

        let fetched = store.entry_by_id(entry.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "pUC19");
        assert_eq!(fetched.record_type, "plasmid");
        assert!(store.entry_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_folder_contents() {
        let store = Store::in_memory().await.unwrap();
        let folder = store
            .create_folder("alice@example.org", "strains", false)
            .await
            .unwrap();
        let e1 = store
            .create_entry("alice@example.org", "one", "strain")
            .await
            .unwrap();
        let e2 = store
            .create_entry("alice@example.org", "two", "strain")
            .await
            .unwrap();

        store.add_to_folder(folder.id, e1.id).await.unwrap();
        store.add_to_folder(folder.id, e2.id).await.unwrap();
        // Re-adding is a no-op.
        store.add_to_folder(folder.id, e1.id).await.unwrap();

        assert_eq!(
            store.folder_contents(folder.id).await.unwrap(),
            vec![e1.id, e2.id]
        );

        store.remove_from_folder(folder.id, e1.id).await.unwrap();
        assert_eq!(store.folder_contents(folder.id).await.unwrap(), vec![e2.id]);
    }

    #[tokio::test]
    async fn test_propagate_flag_toggle() {
        let store = Store::in_memory().await.unwrap();
        let folder = store
            .create_folder("alice@example.org", "shared", false)
            .await
            .unwrap();
        assert!(!folder.propagate_permissions);

        store.set_propagate_permissions(folder.id, true).await.unwrap();
        let fetched = store.folder_by_id(folder.id).await.unwrap().unwrap();
        assert!(fetched.propagate_permissions);
    }

    #[tokio::test]
    async fn test_upload_round_trip() {
        let store = Store::in_memory().await.unwrap();
        let upload = store
            .create_upload("bob@example.org", "march import")
            .await
            .unwrap();
        let fetched = store.upload_by_id(upload.id).await.unwrap().unwrap();
        assert_eq!(fetched.owner_email, "bob@example.org");
    }
}
