//! Error types for the authorization engine.
//!
//! # Security Note
//! `Forbidden` and `NotFound` are safe to report to callers as-is. Storage
//! and propagation failures are logged server-side and should reach external
//! callers only as a generic failure, though `PartialPropagation` carries
//! enough detail (the entry ids already applied) for a safe retry of the
//! remainder.

use store::StoreError;
use thiserror::Error;

use crate::propagation::PropagationReport;

/// A specialized Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthzError>;

#[derive(Error, Debug)]
pub enum AuthzError {
    /// The requested entry, folder, upload, or account does not exist.
    /// Deliberately distinct from `Forbidden`.
    #[error("{0} not found")]
    NotFound(String),

    /// The caller lacks the required read or write privilege. Always
    /// fail-fast, never silently downgraded.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Malformed permission request: the subject or a kind field could not
    /// be resolved.
    #[error("Invalid permission request: {0}")]
    InvalidRequest(String),

    /// Persistence failure. Surfaced unchanged; retry policy, if any,
    /// belongs to the storage layer.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// A propagation sequence applied to some but not all entries before
    /// failing. Re-invoking is safe: per-entry application is idempotent.
    #[error("Propagation over folder {} stopped after {} of {} entries",
        report.folder_id, report.applied.len(), report.attempted)]
    PartialPropagation {
        report: PropagationReport,
        #[source]
        source: StoreError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthzError::NotFound("entry 42".to_string());
        assert_eq!(err.to_string(), "entry 42 not found");

        let err = AuthzError::Forbidden("bob@example.org lacks write access".to_string());
        assert_eq!(
            err.to_string(),
            "Access denied: bob@example.org lacks write access"
        );
    }

    #[test]
    fn test_partial_propagation_display_counts() {
        let err = AuthzError::PartialPropagation {
            report: PropagationReport {
                folder_id: 3,
                attempted: 5,
                applied: vec![10, 11],
                failed: Some(12),
            },
            source: StoreError::Initialization("disk full".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Propagation over folder 3 stopped after 2 of 5 entries"
        );
    }
}
