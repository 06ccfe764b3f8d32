//! Project entity and its owned sub-records.
//!
//! A project always has 1-2 associated students (the "group"). The status
//! history and communication log are append-only: entries are immutable once
//! pushed and no operation rewrites them. Milestones are stamped out of the
//! year's template at approval time; their due dates are cumulative offsets
//! from the approval date and are not independently editable at creation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Topic text in both languages used by the institution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BilingualText {
    #[serde(default)]
    pub vi: String,
    #[serde(default)]
    pub en: String,
}

/// Project lifecycle status.
///
/// `Pending`/`Approved`/`Rejected` come from the registration flow; the rest
/// are reached only by forward transitions after approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    InProgress,
    Submitted,
    Defended,
    Scored,
}

/// One append-only status history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: ProjectStatus,
    pub at: DateTime<Utc>,
    /// Actor id (advisor or admin) that caused the transition
    #[serde(default)]
    pub by: String,
    #[serde(default)]
    pub note: String,
}

/// Completion state of one milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    #[default]
    Upcoming,
    Submitted,
    Done,
    Overdue,
}

/// A milestone on a project's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub title: String,
    pub due: DateTime<Utc>,
    #[serde(default)]
    pub status: MilestoneStatus,
    /// Local-store key of an attached submission blob (`file_<id>`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_file: Option<String>,
}

/// One append-only communication log entry: either a free-form message or a
/// generated event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogEntry {
    Message {
        at: DateTime<Utc>,
        from: String,
        text: String,
        /// Local-store key of an attached blob (`file_<id>`)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attachment: Option<String>,
    },
    Event {
        at: DateTime<Utc>,
        text: String,
    },
}

/// Result of a topic similarity check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// 0.0 ..= 1.0
    pub score: f64,
    #[serde(default)]
    pub matched_topic: String,
    pub checked_at: DateTime<Utc>,
}

/// Final report submission slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FinalSubmission {
    /// Local-store key of the report blob
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_archive: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Defense committee assignment slots (advisor ids).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CommitteeAssignment {
    #[serde(default)]
    pub chair: String,
    #[serde(default)]
    pub secretary: String,
    #[serde(default)]
    pub members: Vec<String>,
}

/// Scheduled defense slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefenseSlot {
    pub at: DateTime<Utc>,
    #[serde(default)]
    pub room: String,
}

/// Per-role scores for a defended project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScoreCard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committee: Option<f64>,
}

/// A final-year project and its group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub topic: BilingualText,
    #[serde(default)]
    pub advisor_id: String,
    #[serde(default)]
    pub status: ProjectStatus,
    /// 1-2 student ids
    #[serde(default)]
    pub group: Vec<String>,
    #[serde(default)]
    pub status_history: Vec<StatusEntry>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub log: Vec<LogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<SimilarityResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_submission: Option<FinalSubmission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committee: Option<CommitteeAssignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defense: Option<DefenseSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<ScoreCard>,
}

impl Project {
    /// Append a status transition and update the current status.
    ///
    /// History entries are immutable once appended; this is the only way the
    /// history grows.
    pub fn push_status(&mut self, status: ProjectStatus, by: &str, note: &str) {
        self.status = status;
        self.status_history.push(StatusEntry {
            status,
            at: Utc::now(),
            by: by.to_string(),
            note: note.to_string(),
        });
    }

    /// Append a communication log entry.
    pub fn push_log(&mut self, entry: LogEntry) {
        self.log.push(entry);
    }
}

/// One task in a milestone template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateTask {
    pub title: String,
    /// Duration of this task in days; due dates accumulate across tasks
    pub days: u32,
}

/// Ordered task list used to stamp out a project's milestones at approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MilestoneTemplate {
    pub tasks: Vec<TemplateTask>,
}

impl MilestoneTemplate {
    /// Stamp out milestones for a project approved at `approval_date`.
    ///
    /// Each milestone's due date is the cumulative offset of all task
    /// durations up to and including it.
    pub fn instantiate(&self, approval_date: DateTime<Utc>) -> Vec<Milestone> {
        let mut offset_days: i64 = 0;
        self.tasks
            .iter()
            .map(|task| {
                offset_days += i64::from(task.days);
                Milestone {
                    title: task.title.clone(),
                    due: approval_date + Duration::days(offset_days),
                    status: MilestoneStatus::Upcoming,
                    submission_file: None,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_milestone_due_dates_are_cumulative() {
        let template = MilestoneTemplate {
            tasks: vec![
                TemplateTask {
                    title: "Outline".to_string(),
                    days: 7,
                },
                TemplateTask {
                    title: "Prototype".to_string(),
                    days: 30,
                },
                TemplateTask {
                    title: "Report draft".to_string(),
                    days: 14,
                },
            ],
        };

        let approved = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let milestones = template.instantiate(approved);

        assert_eq!(milestones.len(), 3);
        assert_eq!(milestones[0].due, approved + Duration::days(7));
        assert_eq!(milestones[1].due, approved + Duration::days(37));
        assert_eq!(milestones[2].due, approved + Duration::days(51));
        assert!(milestones
            .iter()
            .all(|m| m.status == MilestoneStatus::Upcoming));
    }

    #[test]
    fn test_push_status_appends_history() {
        let mut project = Project {
            id: "P1".to_string(),
            topic: BilingualText::default(),
            advisor_id: "A1".to_string(),
            status: ProjectStatus::Pending,
            group: vec!["155N0001/21".to_string()],
            status_history: vec![],
            milestones: vec![],
            log: vec![],
            similarity: None,
            final_submission: None,
            committee: None,
            defense: None,
            scores: None,
        };

        project.push_status(ProjectStatus::Approved, "A1", "looks good");
        project.push_status(ProjectStatus::InProgress, "A1", "");

        assert_eq!(project.status, ProjectStatus::InProgress);
        assert_eq!(project.status_history.len(), 2);
        assert_eq!(project.status_history[0].status, ProjectStatus::Approved);
    }
}
