//! Single-instance-per-year configuration blobs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Settings type enumeration, matching the backend's settings endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsKind {
    MilestoneTemplate,
    Announcements,
    Defense,
    Scoring,
}

impl SettingsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingsKind::MilestoneTemplate => "milestone_template",
            SettingsKind::Announcements => "announcements",
            SettingsKind::Defense => "defense",
            SettingsKind::Scoring => "scoring",
        }
    }
}

impl fmt::Display for SettingsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Defense-round configuration for one academic year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefenseSettings {
    /// Minutes allotted per project defense
    pub slot_minutes: u32,
    #[serde(default)]
    pub rooms: Vec<String>,
    /// Committee sizes per tier: [chair, secretary, members]
    pub committee_size: [u32; 3],
}

impl Default for DefenseSettings {
    fn default() -> Self {
        Self {
            slot_minutes: 30,
            rooms: Vec::new(),
            committee_size: [1, 1, 3],
        }
    }
}

/// Score weighting configuration for one academic year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringSettings {
    /// Weights for [supervisor, reviewer, committee]; expected to sum to 1.0
    pub weights: [f64; 3],
    pub pass_threshold: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            weights: [0.3, 0.3, 0.4],
            pass_threshold: 5.0,
        }
    }
}
