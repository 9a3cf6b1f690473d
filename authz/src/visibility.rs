//! Public visibility facade.
//!
//! "Public" is not a flag on the object: it is a read grant held by the
//! well-known public group. These helpers wrap the general grant/revoke
//! path for that one subject, plus the queries the index filter and UI
//! badges are built from.

use entities::{AccessPermission, Group, GroupType, Subject, EVERYONE_GROUP_UUID, PUBLIC_GROUP_UUID};

use crate::error::Result;
use crate::AuthzEngine;

impl AuthzEngine {
    /// The well-known public group, created on first reference. Idempotent
    /// and safe under concurrent first use: creation is insert-if-absent
    /// against the group UUID uniqueness constraint.
    pub async fn public_group(&self) -> Result<Group> {
        Ok(self
            .store()
            .get_or_create_group_by_uuid(PUBLIC_GROUP_UUID, "Public", GroupType::Public)
            .await?)
    }

    /// The well-known group every registered account belongs to. Membership
    /// is implicit: grant lookups add this group's id for any registered
    /// caller, so it never has membership rows.
    pub async fn everyone_group(&self) -> Result<Group> {
        Ok(self
            .store()
            .get_or_create_group_by_uuid(EVERYONE_GROUP_UUID, "Everyone", GroupType::Everyone)
            .await?)
    }

    /// Grant the public group read access to the entry. The caller must hold
    /// write access. Returns whether the grant now exists.
    pub async fn enable_public_read(&self, caller: &str, entry_id: i64) -> Result<bool> {
        let group = self.public_group().await?;
        let request = AccessPermission::read_entry(entry_id, Subject::Group(group.id));
        Ok(self.grant(caller, &request).await?.is_some())
    }

    /// Revoke the public group's read access to the entry. Disabling access
    /// that was never enabled is a no-op; this always reports success.
    pub async fn disable_public_read(&self, caller: &str, entry_id: i64) -> Result<bool> {
        let group = self.public_group().await?;
        let request = AccessPermission::read_entry(entry_id, Subject::Group(group.id));
        self.revoke(caller, &request).await?;
        Ok(true)
    }

    /// True iff the public group holds a read grant on the entry.
    pub async fn is_entry_publicly_visible(&self, entry_id: i64) -> Result<bool> {
        let group = self.public_group().await?;
        Ok(self
            .store()
            .has_any_grant(Some(entry_id), &[], None, &[group.id], true, false)
            .await?)
    }

    /// True iff the public group holds a read grant on the folder.
    pub async fn is_folder_publicly_visible(&self, folder_id: i64) -> Result<bool> {
        let group = self.public_group().await?;
        Ok(self
            .store()
            .has_any_grant(None, &[folder_id], None, &[group.id], true, false)
            .await?)
    }
}
