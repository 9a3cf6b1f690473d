//! Folder permission propagation.
//!
//! When a folder has `propagate_permissions` set, every grant or revocation
//! performed on it is mirrored onto each entry it currently contains.
//! Propagation is a sequence of independent per-entry operations, not one
//! transaction: a failure partway through leaves already-applied entries
//! changed and surfaces as [`AuthzError::PartialPropagation`] carrying the
//! entry ids that succeeded. Per-entry application is idempotent, so
//! re-invoking after a partial failure is safe.

use entities::{AuthObject, Subject};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::{AuthzError, Result};
use crate::AuthzEngine;

/// Progress record for one propagation pass over a folder's contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropagationReport {
    pub folder_id: i64,
    /// How many entries the folder held when the pass started.
    pub attempted: usize,
    /// Entry ids fully applied, in order.
    pub applied: Vec<i64>,
    /// The entry the pass failed on, if it did not complete.
    pub failed: Option<i64>,
}

impl PropagationReport {
    fn begin(folder_id: i64, attempted: usize) -> Self {
        Self {
            folder_id,
            attempted,
            applied: Vec::new(),
            failed: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_none() && self.applied.len() == self.attempted
    }
}

impl AuthzEngine {
    /// Mirror one (subject, can_read, can_write) grant change onto every
    /// entry currently in the folder. `add` selects grant versus revoke.
    /// Contents are read at call time; concurrent membership changes are an
    /// accepted race.
    pub(crate) async fn apply_to_contents(
        &self,
        folder: &entities::Folder,
        subject: Subject,
        can_read: bool,
        can_write: bool,
        add: bool,
    ) -> Result<PropagationReport> {
        let contents = self.store().folder_contents(folder.id).await?;
        let mut report = PropagationReport::begin(folder.id, contents.len());

        for entry_id in contents {
            let object = AuthObject::Entry(entry_id);
            let result = if add {
                self.store()
                    .create_grant(subject, object, can_read, can_write)
                    .await
                    .map(|_| ())
            } else {
                self.store()
                    .delete_grant(subject, object, can_read, can_write)
                    .await
                    .map(|_| ())
            };

            match result {
                Ok(()) => report.applied.push(entry_id),
                Err(source) => {
                    report.failed = Some(entry_id);
                    error!(
                        "Propagation over folder {} failed at entry {} after {} of {}: {}",
                        folder.id,
                        entry_id,
                        report.applied.len(),
                        report.attempted,
                        source
                    );
                    return Err(AuthzError::PartialPropagation { report, source });
                }
            }
        }

        debug!(
            "Propagated {} for {} across {} entries of folder {}",
            if add { "grant" } else { "revoke" },
            subject,
            report.attempted,
            folder.id
        );
        Ok(report)
    }

    /// Re-apply (`add = true`) or remove (`add = false`) every currently-set
    /// folder grant against every entry the folder contains. Used when the
    /// propagation flag is toggled after grants already exist.
    ///
    /// Only the folder owner or an administrator may invoke this.
    pub async fn propagate_all(
        &self,
        caller: &str,
        folder_id: i64,
        add: bool,
    ) -> Result<PropagationReport> {
        let folder = self
            .store()
            .folder_by_id(folder_id)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("folder {folder_id}")))?;

        if !folder.owner_email.eq_ignore_ascii_case(caller)
            && !self.store().is_administrator(caller).await?
        {
            return Err(AuthzError::Forbidden(format!(
                "{caller} may not propagate permissions on folder {folder_id}"
            )));
        }

        let grants = self
            .store()
            .grants_for_object(AuthObject::Folder(folder_id))
            .await?;
        if grants.is_empty() {
            debug!("Folder {} has no grants to propagate", folder_id);
            return Ok(PropagationReport::begin(folder_id, 0));
        }

        let contents = self.store().folder_contents(folder_id).await?;
        let mut report = PropagationReport::begin(folder_id, contents.len());

        for entry_id in contents {
            let object = AuthObject::Entry(entry_id);
            for grant in &grants {
                let result = if add {
                    self.store()
                        .create_grant(grant.subject, object, grant.can_read, grant.can_write)
                        .await
                        .map(|_| ())
                } else {
                    self.store()
                        .delete_grant(grant.subject, object, grant.can_read, grant.can_write)
                        .await
                        .map(|_| ())
                };

                if let Err(source) = result {
                    report.failed = Some(entry_id);
                    error!(
                        "Bulk propagation over folder {} failed at entry {} after {} of {}: {}",
                        folder_id,
                        entry_id,
                        report.applied.len(),
                        report.attempted,
                        source
                    );
                    return Err(AuthzError::PartialPropagation { report, source });
                }
            }
            report.applied.push(entry_id);
        }

        info!(
            "{} propagated {} grants {} {} entries of folder {}",
            caller,
            grants.len(),
            if add { "onto" } else { "off" },
            report.attempted,
            folder_id
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_completion() {
        let mut report = PropagationReport::begin(1, 2);
        assert!(!report.is_complete());

        report.applied.push(10);
        report.applied.push(11);
        assert!(report.is_complete());

        report.failed = Some(12);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_report_serializes_for_api_responses() {
        let report = PropagationReport {
            folder_id: 3,
            attempted: 2,
            applied: vec![10],
            failed: Some(11),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["folder_id"], 3);
        assert_eq!(json["applied"], serde_json::json!([10]));
        assert_eq!(json["failed"], 11);
    }
}
