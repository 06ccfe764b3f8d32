//! Advisor entity.

use serde::{Deserialize, Serialize};

/// Per-role capacity limits for an advisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorQuota {
    /// How many projects this advisor may supervise
    pub supervision: u32,
    /// Committee capacity per tier: [chair, secretary, member]
    pub committee: [u32; 3],
}

impl Default for AdvisorQuota {
    fn default() -> Self {
        Self {
            supervision: 5,
            committee: [3, 3, 6],
        }
    }
}

/// An advisor record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub quota: AdvisorQuota,
    /// Major ids this advisor can supervise
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(default)]
    pub is_admin: bool,
}
