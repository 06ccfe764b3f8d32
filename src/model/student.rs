//! Student entity.

use serde::{Deserialize, Serialize};

/// Registration approval state for a student account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// Self-registered, awaiting administrative approval
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// A student record.
///
/// The id is institution-issued (e.g. "155N0001/21"), not generated here.
/// Students are never hard-deleted in the domain sense; `remove` only drops
/// them from the active year's collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    /// Major name (flat string; the server's nested major object is
    /// flattened on read)
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub classroom: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub approved: ApprovalStatus,
    /// Set after administrative password resets and bulk imports
    #[serde(default)]
    pub must_change_password: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default() {
        // Old local snapshots may predate newer fields
        let s: Student = serde_json::from_str(r#"{"id":"155N0001/21","name":"An"}"#).unwrap();
        assert_eq!(s.approved, ApprovalStatus::Pending);
        assert!(!s.must_change_password);
        assert_eq!(s.major, "");
    }
}
