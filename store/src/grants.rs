//! The grant table: the only durable state the authorization engine owns.
//!
//! One row per (subject, object, can_read, can_write). Creation is
//! insert-if-absent against the six-column UNIQUE index, so concurrent
//! duplicate grants resolve to a single row without surfacing an error to
//! either caller.

use entities::{Account, AuthObject, Grant, ObjectKind, Subject, SubjectKind};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use crate::groups::row_to_group;
use crate::{Result, Store};

fn row_to_grant(row: SqliteRow) -> Result<Grant> {
    let subject_kind: String = row.try_get("subject_kind")?;
    let object_kind: String = row.try_get("object_kind")?;
    Ok(Grant {
        id: row.try_get("id")?,
        subject: Subject::from_kind(SubjectKind::parse(&subject_kind)?, row.try_get("subject_id")?),
        object: AuthObject::from_kind(ObjectKind::parse(&object_kind)?, row.try_get("object_id")?),
        can_read: row.try_get("can_read")?,
        can_write: row.try_get("can_write")?,
    })
}

impl Store {
    /// Insert-if-absent creation. Returns the surviving row whether this
    /// call inserted it or a concurrent caller got there first.
    pub async fn create_grant(
        &self,
        subject: Subject,
        object: AuthObject,
        can_read: bool,
        can_write: bool,
    ) -> Result<Grant> {
        sqlx::query(
            "INSERT INTO grants (subject_kind, subject_id, object_kind, object_id, can_read, can_write) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT DO NOTHING",
        )
        .bind(subject.kind().as_str())
        .bind(subject.id())
        .bind(object.kind().as_str())
        .bind(object.id())
        .bind(can_read)
        .bind(can_write)
        .execute(self.pool())
        .await?;

        let row = sqlx::query(
            "SELECT id, subject_kind, subject_id, object_kind, object_id, can_read, can_write \
             FROM grants \
             WHERE subject_kind = ? AND subject_id = ? AND object_kind = ? AND object_id = ? \
               AND can_read = ? AND can_write = ?",
        )
        .bind(subject.kind().as_str())
        .bind(subject.id())
        .bind(object.kind().as_str())
        .bind(object.id())
        .bind(can_read)
        .bind(can_write)
        .fetch_one(self.pool())
        .await?;

        debug!("Grant ensured for {} on {}", subject, object);
        row_to_grant(row)
    }

    pub async fn find_grant(
        &self,
        subject: Subject,
        object: AuthObject,
        can_read: bool,
        can_write: bool,
    ) -> Result<Option<Grant>> {
        let row = sqlx::query(
            "SELECT id, subject_kind, subject_id, object_kind, object_id, can_read, can_write \
             FROM grants \
             WHERE subject_kind = ? AND subject_id = ? AND object_kind = ? AND object_id = ? \
               AND can_read = ? AND can_write = ?",
        )
        .bind(subject.kind().as_str())
        .bind(subject.id())
        .bind(object.kind().as_str())
        .bind(object.id())
        .bind(can_read)
        .bind(can_write)
        .fetch_optional(self.pool())
        .await?;
        row.map(row_to_grant).transpose()
    }

    pub async fn grant_exists(
        &self,
        subject: Subject,
        object: AuthObject,
        can_read: bool,
        can_write: bool,
    ) -> Result<bool> {
        Ok(self
            .find_grant(subject, object, can_read, can_write)
            .await?
            .is_some())
    }

    pub async fn grant_by_id(&self, id: i64) -> Result<Option<Grant>> {
        let row = sqlx::query(
            "SELECT id, subject_kind, subject_id, object_kind, object_id, can_read, can_write \
             FROM grants WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(row_to_grant).transpose()
    }

    /// Delete the matching grant. Returns whether a row was removed; a
    /// missing grant is the revoke no-op case, not an error.
    pub async fn delete_grant(
        &self,
        subject: Subject,
        object: AuthObject,
        can_read: bool,
        can_write: bool,
    ) -> Result<bool> {
        let affected = sqlx::query(
            "DELETE FROM grants \
             WHERE subject_kind = ? AND subject_id = ? AND object_kind = ? AND object_id = ? \
               AND can_read = ? AND can_write = ?",
        )
        .bind(subject.kind().as_str())
        .bind(subject.id())
        .bind(object.kind().as_str())
        .bind(object.id())
        .bind(can_read)
        .bind(can_write)
        .execute(self.pool())
        .await?
        .rows_affected();

        if affected > 0 {
            debug!("Grant removed for {} on {}", subject, object);
        }
        Ok(affected > 0)
    }

    pub async fn delete_grant_by_id(&self, id: i64) -> Result<bool> {
        let affected = sqlx::query("DELETE FROM grants WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    /// Delete every grant on the object. Used when the object itself is
    /// deleted.
    pub async fn clear_grants(&self, object: AuthObject) -> Result<u64> {
        let affected = sqlx::query("DELETE FROM grants WHERE object_kind = ? AND object_id = ?")
            .bind(object.kind().as_str())
            .bind(object.id())
            .execute(self.pool())
            .await?
            .rows_affected();

        debug!("Cleared {} grants on {}", affected, object);
        Ok(affected)
    }

    /// Replace every grant on the object with the supplied set, in one
    /// transaction. Either the previous grants are all gone and the new set
    /// is in place, or a failure rolls back and the object's grants are
    /// untouched. Each insert is insert-if-absent, so duplicate tuples in
    /// the supplied set collapse to one row.
    pub async fn replace_grants(
        &self,
        object: AuthObject,
        grants: &[(Subject, bool, bool)],
    ) -> Result<Vec<Grant>> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM grants WHERE object_kind = ? AND object_id = ?")
            .bind(object.kind().as_str())
            .bind(object.id())
            .execute(&mut *tx)
            .await?;

        let mut created = Vec::with_capacity(grants.len());
        for (subject, can_read, can_write) in grants {
            sqlx::query(
                "INSERT INTO grants (subject_kind, subject_id, object_kind, object_id, can_read, can_write) \
                 VALUES (?, ?, ?, ?, ?, ?) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(subject.kind().as_str())
            .bind(subject.id())
            .bind(object.kind().as_str())
            .bind(object.id())
            .bind(can_read)
            .bind(can_write)
            .execute(&mut *tx)
            .await?;

            let row = sqlx::query(
                "SELECT id, subject_kind, subject_id, object_kind, object_id, can_read, can_write \
                 FROM grants \
                 WHERE subject_kind = ? AND subject_id = ? AND object_kind = ? AND object_id = ? \
                   AND can_read = ? AND can_write = ?",
            )
            .bind(subject.kind().as_str())
            .bind(subject.id())
            .bind(object.kind().as_str())
            .bind(object.id())
            .bind(can_read)
            .bind(can_write)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row_to_grant(row)?);
        }

        tx.commit().await?;

        debug!("Replaced grants on {} with {} new", object, created.len());
        Ok(created)
    }

    /// Every grant currently set on the object, in creation order.
    pub async fn grants_for_object(&self, object: AuthObject) -> Result<Vec<Grant>> {
        let rows = sqlx::query(
            "SELECT id, subject_kind, subject_id, object_kind, object_id, can_read, can_write \
             FROM grants WHERE object_kind = ? AND object_id = ? ORDER BY id",
        )
        .bind(object.kind().as_str())
        .bind(object.id())
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(row_to_grant).collect()
    }

    /// True if at least one grant in the union of `{account} ∪ groups`
    /// against any object in `{entry} ∪ folders` satisfies the requested
    /// access level. A requested flag constrains the corresponding column;
    /// an unrequested flag matches either value.
    pub async fn has_any_grant(
        &self,
        entry: Option<i64>,
        folders: &[i64],
        account: Option<i64>,
        groups: &[i64],
        can_read: bool,
        can_write: bool,
    ) -> Result<bool> {
        let mut object_clauses = Vec::new();
        if entry.is_some() {
            object_clauses.push("(object_kind = 'entry' AND object_id = ?)".to_string());
        }
        if !folders.is_empty() {
            let marks = vec!["?"; folders.len()].join(", ");
            object_clauses.push(format!("(object_kind = 'folder' AND object_id IN ({marks}))"));
        }

        let mut subject_clauses = Vec::new();
        if account.is_some() {
            subject_clauses.push("(subject_kind = 'account' AND subject_id = ?)".to_string());
        }
        if !groups.is_empty() {
            let marks = vec!["?"; groups.len()].join(", ");
            subject_clauses.push(format!("(subject_kind = 'group' AND subject_id IN ({marks}))"));
        }

        if object_clauses.is_empty() || subject_clauses.is_empty() {
            return Ok(false);
        }

        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM grants WHERE ({}) AND ({}) \
             AND (? = 0 OR can_read = 1) AND (? = 0 OR can_write = 1))",
            object_clauses.join(" OR "),
            subject_clauses.join(" OR ")
        );

        let mut query = sqlx::query_scalar::<_, bool>(&sql);
        if let Some(id) = entry {
            query = query.bind(id);
        }
        for id in folders {
            query = query.bind(id);
        }
        if let Some(id) = account {
            query = query.bind(id);
        }
        for id in groups {
            query = query.bind(id);
        }
        query = query.bind(can_read).bind(can_write);

        Ok(query.fetch_one(self.pool()).await?)
    }

    /// Single-object variant of [`has_any_grant`](Store::has_any_grant) for
    /// uploads, which never participate in multi-folder queries.
    pub async fn has_upload_grant(
        &self,
        upload_id: i64,
        account: Option<i64>,
        groups: &[i64],
        can_read: bool,
        can_write: bool,
    ) -> Result<bool> {
        let mut subject_clauses = Vec::new();
        if account.is_some() {
            subject_clauses.push("(subject_kind = 'account' AND subject_id = ?)".to_string());
        }
        if !groups.is_empty() {
            let marks = vec!["?"; groups.len()].join(", ");
            subject_clauses.push(format!("(subject_kind = 'group' AND subject_id IN ({marks}))"));
        }
        if subject_clauses.is_empty() {
            return Ok(false);
        }

        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM grants \
             WHERE object_kind = 'upload' AND object_id = ? AND ({}) \
             AND (? = 0 OR can_read = 1) AND (? = 0 OR can_write = 1))",
            subject_clauses.join(" OR ")
        );

        let mut query = sqlx::query_scalar::<_, bool>(&sql).bind(upload_id);
        if let Some(id) = account {
            query = query.bind(id);
        }
        for id in groups {
            query = query.bind(id);
        }
        query = query.bind(can_read).bind(can_write);

        Ok(query.fetch_one(self.pool()).await?)
    }

    /// Accounts holding a grant with exactly these flags on the object.
    /// Exact flag matching: these listings are the source of truth for
    /// re-propagation, which must reproduce the stored tuples.
    pub async fn accounts_with_access(
        &self,
        object: AuthObject,
        can_read: bool,
        can_write: bool,
    ) -> Result<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(
            "SELECT a.id, a.email, a.full_name, a.is_admin, a.created_at \
             FROM accounts a \
             JOIN grants g ON g.subject_kind = 'account' AND g.subject_id = a.id \
             WHERE g.object_kind = ? AND g.object_id = ? \
               AND g.can_read = ? AND g.can_write = ? \
             ORDER BY a.id",
        )
        .bind(object.kind().as_str())
        .bind(object.id())
        .bind(can_read)
        .bind(can_write)
        .fetch_all(self.pool())
        .await?;
        Ok(accounts)
    }

    /// Groups holding a grant with exactly these flags on the object.
    pub async fn groups_with_access(
        &self,
        object: AuthObject,
        can_read: bool,
        can_write: bool,
    ) -> Result<Vec<entities::Group>> {
        let rows = sqlx::query(
            "SELECT gr.id, gr.uuid, gr.label, gr.description, gr.group_type, gr.owner_email, gr.created_at \
             FROM groups gr \
             JOIN grants g ON g.subject_kind = 'group' AND g.subject_id = gr.id \
             WHERE g.object_kind = ? AND g.object_id = ? \
               AND g.can_read = ? AND g.can_write = ? \
             ORDER BY gr.id",
        )
        .bind(object.kind().as_str())
        .bind(object.id())
        .bind(can_read)
        .bind(can_write)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(row_to_group).collect()
    }
}
