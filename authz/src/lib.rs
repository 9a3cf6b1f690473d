//! Authorization and permission-propagation engine for the parts registry.
//!
//! This crate decides who may read or write an entry, folder, or draft
//! upload, and keeps folder-level grants consistent with the grants on the
//! entries a folder contains.
//!
//! # Architecture Overview
//!
//! The decision flow for every check:
//!
//! 1. **Resolve the object**: a missing object is `NotFound`, never
//!    `Forbidden`.
//! 2. **Ownership**: the object's owner always passes.
//! 3. **Administrator**: the admin flag bypasses all grant lookups.
//! 4. **Grant lookup**: one store query covering the caller's account and
//!    every group the account belongs to (one level; groups do not nest).
//!
//! Mutations (`grant`, `revoke`, `replace_all`) gate on the same
//! [`AuthzEngine::authorize`] contract with [`Access::Write`] before touching
//! the grant table. Grants against a folder with `propagate_permissions` set
//! are mirrored onto the folder's current contents; see the [`propagation`]
//! module for the partial-failure semantics.
//!
//! The external search indexer builds its security filter from exactly two
//! helpers here: [`AuthzEngine::group_ids_for_caller`] and
//! [`AuthzEngine::is_administrator`]. The engine never queries the index.

pub mod error;
pub mod propagation;
pub mod types;
pub mod visibility;

use entities::{
    AccessPermission, AuthObject, Entry, Folder, Grant, Subject, SubjectKind, Upload,
    EVERYONE_GROUP_UUID,
};
use store::Store;
use tracing::{debug, info, warn};

pub use error::{AuthzError, Result};
pub use propagation::PropagationReport;
pub use types::Access;

/// The authorization engine. Cheap to clone; all state lives in the store.
#[derive(Debug, Clone)]
pub struct AuthzEngine {
    store: Store,
}

/// An object reference resolved to its concrete record.
#[derive(Debug)]
pub(crate) enum ResolvedObject {
    Entry(Entry),
    Folder(Folder),
    Upload(Upload),
}

impl ResolvedObject {
    fn owner_email(&self) -> &str {
        match self {
            ResolvedObject::Entry(entry) => &entry.owner_email,
            ResolvedObject::Folder(folder) => &folder.owner_email,
            ResolvedObject::Upload(upload) => &upload.owner_email,
        }
    }

    fn as_folder(&self) -> Option<&Folder> {
        match self {
            ResolvedObject::Folder(folder) => Some(folder),
            _ => None,
        }
    }
}

impl AuthzEngine {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The single gate every sensitive read and every mutation goes through.
    ///
    /// Fails with `NotFound` if the object does not exist and `Forbidden` if
    /// the caller is neither the owner, an administrator, nor the holder of a
    /// matching grant (directly or through group membership).
    pub async fn authorize(
        &self,
        caller: &str,
        object: &AuthObject,
        access: Access,
    ) -> Result<()> {
        let resolved = self
            .resolve_object(object)
            .await?
            .ok_or_else(|| AuthzError::NotFound(object.to_string()))?;
        self.authorize_resolved(caller, object, &resolved, access)
            .await
    }

    /// Fail-fast read check. No return value, no side effects.
    pub async fn expect_read(&self, caller: &str, object: &AuthObject) -> Result<()> {
        self.authorize(caller, object, Access::Read).await
    }

    /// Fail-fast write check.
    pub async fn expect_write(&self, caller: &str, object: &AuthObject) -> Result<()> {
        self.authorize(caller, object, Access::Write).await
    }

    /// Boolean read check for UI and query contexts. `Forbidden` maps to
    /// `false`; missing objects and storage failures still surface.
    pub async fn can_read(&self, caller: &str, object: &AuthObject) -> Result<bool> {
        self.check(caller, object, Access::Read).await
    }

    /// Boolean write check.
    pub async fn can_write(&self, caller: &str, object: &AuthObject) -> Result<bool> {
        self.check(caller, object, Access::Write).await
    }

    async fn check(&self, caller: &str, object: &AuthObject, access: Access) -> Result<bool> {
        match self.authorize(caller, object, access).await {
            Ok(()) => Ok(true),
            Err(AuthzError::Forbidden(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Add a grant described by the request.
    ///
    /// Returns `Ok(None)` when the target object cannot be located; this is
    /// deliberately distinct from `Forbidden`. Creating a grant that already
    /// exists returns the existing record. When the target is a folder with
    /// propagation enabled, the same grant is applied to every entry it
    /// currently contains before the folder grant itself is recorded.
    pub async fn grant(
        &self,
        caller: &str,
        request: &AccessPermission,
    ) -> Result<Option<Grant>> {
        let object = request.object();
        let Some(resolved) = self.resolve_object(&object).await? else {
            warn!("Grant request from {} against missing {}", caller, object);
            return Ok(None);
        };

        self.authorize_resolved(caller, &object, &resolved, Access::Write)
            .await?;
        let subject = self.resolve_subject(request).await?;

        if let Some(folder) = resolved.as_folder() {
            if folder.propagate_permissions {
                self.apply_to_contents(folder, subject, request.can_read, request.can_write, true)
                    .await?;
            }
        }

        if let Some(existing) = self
            .store
            .find_grant(subject, object, request.can_read, request.can_write)
            .await?
        {
            debug!("Grant for {} on {} already present", subject, object);
            return Ok(Some(existing));
        }

        let grant = self
            .store
            .create_grant(subject, object, request.can_read, request.can_write)
            .await?;
        info!(
            "{} granted {} read={} write={} on {}",
            caller, subject, request.can_read, request.can_write, object
        );
        Ok(Some(grant))
    }

    /// Remove the grant described by the request.
    ///
    /// Revoking a grant that does not exist is a no-op, as is revoking
    /// against an object that no longer exists. Propagates the removal to
    /// folder contents when the folder propagates.
    pub async fn revoke(&self, caller: &str, request: &AccessPermission) -> Result<()> {
        let object = request.object();
        let Some(resolved) = self.resolve_object(&object).await? else {
            debug!("Revoke request from {} against missing {}", caller, object);
            return Ok(());
        };

        self.authorize_resolved(caller, &object, &resolved, Access::Write)
            .await?;
        let subject = self.resolve_subject(request).await?;

        if let Some(folder) = resolved.as_folder() {
            if folder.propagate_permissions {
                self.apply_to_contents(folder, subject, request.can_read, request.can_write, false)
                    .await?;
            }
        }

        let removed = self
            .store
            .delete_grant(subject, object, request.can_read, request.can_write)
            .await?;
        if removed {
            info!(
                "{} revoked {} read={} write={} on {}",
                caller, subject, request.can_read, request.can_write, object
            );
        } else {
            debug!("Revoke no-op for {} on {}", subject, object);
        }
        Ok(())
    }

    /// Clear every grant on the object and set the supplied ones.
    ///
    /// All subjects are resolved up front, and the clear-and-create sequence
    /// runs as one store transaction, so a malformed request or a failure
    /// partway through leaves the existing grants intact. On a propagating
    /// folder the new grant set is then mirrored onto the folder's current
    /// entries, keeping this operation consistent with `grant`/`revoke`;
    /// grants removed by the clearing step are not retroactively revoked
    /// from entries (use `propagate_all` with `add = false` for that).
    pub async fn replace_all(
        &self,
        caller: &str,
        object: &AuthObject,
        requests: &[AccessPermission],
    ) -> Result<Vec<Grant>> {
        let resolved = self
            .resolve_object(object)
            .await?
            .ok_or_else(|| AuthzError::NotFound(object.to_string()))?;
        self.authorize_resolved(caller, object, &resolved, Access::Write)
            .await?;

        let mut subjects = Vec::with_capacity(requests.len());
        for request in requests {
            subjects.push(self.resolve_subject(request).await?);
        }

        let specs: Vec<(Subject, bool, bool)> = subjects
            .iter()
            .zip(requests)
            .map(|(subject, request)| (*subject, request.can_read, request.can_write))
            .collect();
        let created = self.store.replace_grants(*object, &specs).await?;
        info!(
            "{} replaced grants on {} with {} new",
            caller,
            object,
            created.len()
        );

        if let Some(folder) = resolved.as_folder() {
            if folder.propagate_permissions {
                for (subject, request) in subjects.iter().zip(requests) {
                    self.apply_to_contents(
                        folder,
                        *subject,
                        request.can_read,
                        request.can_write,
                        true,
                    )
                    .await?;
                }
            }
        }

        Ok(created)
    }

    /// Grants explicitly set on the object, as boundary DTOs with subject
    /// display names filled in. The public group's read grant is omitted
    /// unless `include_public` is set; callers display that state through
    /// the visibility queries instead.
    pub async fn list_permissions(
        &self,
        object: &AuthObject,
        include_public: bool,
    ) -> Result<Vec<AccessPermission>> {
        let mut permissions = Vec::new();

        for account in self.store.accounts_with_access(*object, true, false).await? {
            permissions.push(
                AccessPermission::new(*object, Subject::Account(account.id), true, false)
                    .with_display(account.full_name),
            );
        }
        for account in self.store.accounts_with_access(*object, false, true).await? {
            permissions.push(
                AccessPermission::new(*object, Subject::Account(account.id), false, true)
                    .with_display(account.full_name),
            );
        }
        for group in self.store.groups_with_access(*object, true, false).await? {
            if !include_public && group.is_public_group() {
                continue;
            }
            permissions.push(
                AccessPermission::new(*object, Subject::Group(group.id), true, false)
                    .with_display(group.label),
            );
        }
        for group in self.store.groups_with_access(*object, false, true).await? {
            permissions.push(
                AccessPermission::new(*object, Subject::Group(group.id), false, true)
                    .with_display(group.label),
            );
        }

        Ok(permissions)
    }

    /// Delete a specific grant by id after verifying it targets the named
    /// object. A stale id or an id pointing at a different object is a
    /// no-op.
    pub async fn remove_permission_by_id(
        &self,
        caller: &str,
        object: &AuthObject,
        grant_id: i64,
    ) -> Result<()> {
        let Some(resolved) = self.resolve_object(object).await? else {
            return Ok(());
        };
        let Some(grant) = self.store.grant_by_id(grant_id).await? else {
            return Ok(());
        };

        self.authorize_resolved(caller, object, &resolved, Access::Write)
            .await?;

        if grant.object != *object {
            debug!(
                "Grant {} targets {} not {}; ignoring removal",
                grant_id, grant.object, object
            );
            return Ok(());
        }

        self.store.delete_grant_by_id(grant_id).await?;
        info!("{} removed grant {} from {}", caller, grant_id, object);
        Ok(())
    }

    /// Ids of every group the caller belongs to, including the well-known
    /// everyone group once it exists. One of the two inputs the external
    /// search security filter is built from.
    pub async fn group_ids_for_caller(&self, caller: &str) -> Result<Vec<i64>> {
        let account = self
            .store
            .account_by_email(caller)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("account {caller}")))?;
        self.effective_group_ids(account.id).await
    }

    /// Whether the caller carries the administrator flag. Unknown callers
    /// are not administrators.
    pub async fn is_administrator(&self, caller: &str) -> Result<bool> {
        Ok(self.store.is_administrator(caller).await?)
    }

    pub(crate) async fn resolve_object(
        &self,
        object: &AuthObject,
    ) -> Result<Option<ResolvedObject>> {
        let resolved = match object {
            AuthObject::Entry(id) => self.store.entry_by_id(*id).await?.map(ResolvedObject::Entry),
            AuthObject::Folder(id) => self
                .store
                .folder_by_id(*id)
                .await?
                .map(ResolvedObject::Folder),
            AuthObject::Upload(id) => self
                .store
                .upload_by_id(*id)
                .await?
                .map(ResolvedObject::Upload),
        };
        Ok(resolved)
    }

    pub(crate) async fn authorize_resolved(
        &self,
        caller: &str,
        object: &AuthObject,
        resolved: &ResolvedObject,
        access: Access,
    ) -> Result<()> {
        // Ownership and the admin flag are checked before any grant lookup.
        if resolved.owner_email().eq_ignore_ascii_case(caller) {
            return Ok(());
        }

        let Some(account) = self.store.account_by_email(caller).await? else {
            warn!("Authorization check for unknown account {}", caller);
            return Err(AuthzError::Forbidden(format!(
                "{caller} lacks {access} access to {object}"
            )));
        };
        if account.is_admin {
            return Ok(());
        }

        let groups = self.effective_group_ids(account.id).await?;
        let (can_read, can_write) = access.flags();
        let allowed = match object {
            AuthObject::Entry(id) => {
                self.store
                    .has_any_grant(Some(*id), &[], Some(account.id), &groups, can_read, can_write)
                    .await?
            }
            AuthObject::Folder(id) => {
                self.store
                    .has_any_grant(None, &[*id], Some(account.id), &groups, can_read, can_write)
                    .await?
            }
            AuthObject::Upload(id) => {
                self.store
                    .has_upload_grant(*id, Some(account.id), &groups, can_read, can_write)
                    .await?
            }
        };

        if allowed {
            Ok(())
        } else {
            warn!("{} denied {} access to {}", caller, access, object);
            Err(AuthzError::Forbidden(format!(
                "{caller} lacks {access} access to {object}"
            )))
        }
    }

    /// Group ids used for grant lookups: explicit memberships plus the
    /// everyone group. Membership in the everyone group is implicit for
    /// every registered account; it is never enrolled row by row.
    async fn effective_group_ids(&self, account_id: i64) -> Result<Vec<i64>> {
        let mut ids = self.store.group_ids_for_account(account_id).await?;
        if let Some(everyone) = self.store.group_by_uuid(EVERYONE_GROUP_UUID).await? {
            if !ids.contains(&everyone.id) {
                ids.push(everyone.id);
            }
        }
        Ok(ids)
    }

    async fn resolve_subject(&self, request: &AccessPermission) -> Result<Subject> {
        match request.subject_kind {
            SubjectKind::Account => self
                .store
                .account_by_id(request.subject_id)
                .await?
                .map(|account| Subject::Account(account.id))
                .ok_or_else(|| {
                    AuthzError::InvalidRequest(format!(
                        "no account with id {}",
                        request.subject_id
                    ))
                }),
            SubjectKind::Group => self
                .store
                .group_by_id(request.subject_id)
                .await?
                .map(|group| Subject::Group(group.id))
                .ok_or_else(|| {
                    AuthzError::InvalidRequest(format!("no group with id {}", request.subject_id))
                }),
        }
    }
}
