//! Core request types for authorization checks.

use serde::{Deserialize, Serialize};

/// The access level an authorization check asks for.
///
/// Read and write are independent flags on a grant (a grant may carry both);
/// a check for one level is satisfied by any grant carrying that flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Read,
    Write,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Read => "read",
            Access::Write => "write",
        }
    }

    /// The (can_read, can_write) pair a grant lookup must satisfy.
    pub(crate) fn flags(&self) -> (bool, bool) {
        match self {
            Access::Read => (true, false),
            Access::Write => (false, true),
        }
    }
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
