//! Canonical domain model.
//!
//! Every collection is partitioned by an academic-year string key; an entity
//! value never embeds its year. These are the shapes the in-memory layer and
//! the local store hold; the remote wire shapes live in `remote::dto` and are
//! translated into these on every read.

pub mod advisor;
pub mod notification;
pub mod project;
pub mod settings;
pub mod student;

pub use advisor::{Advisor, AdvisorQuota};
pub use notification::{Notification, Recipients};
pub use project::{
    BilingualText, CommitteeAssignment, DefenseSlot, FinalSubmission, LogEntry, Milestone,
    MilestoneStatus, MilestoneTemplate, Project, ProjectStatus, ScoreCard, SimilarityResult,
    StatusEntry, TemplateTask,
};
pub use settings::{DefenseSettings, ScoringSettings, SettingsKind};
pub use student::{ApprovalStatus, Student};

use serde::{Deserialize, Serialize};

/// Simple reference entity: a major (field of study).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Major {
    pub id: String,
    pub name: String,
}

/// Simple reference entity: a classroom, back-referencing its major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classroom {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub major_id: String,
}
