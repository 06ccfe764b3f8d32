//! Notification entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Who a notification is addressed to.
///
/// The wire sentinel "all" maps to `All`; anything else is an explicit user
/// id list (a bare non-sentinel string is a single-user list, never a
/// broadcast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Recipients {
    All(String),
    Users(Vec<String>),
}

impl<'de> Deserialize<'de> for Recipients {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            One(String),
            Many(Vec<String>),
        }
        Ok(match Wire::deserialize(deserializer)? {
            Wire::One(s) if s == "all" => Recipients::all(),
            Wire::One(s) => Recipients::Users(vec![s]),
            Wire::Many(ids) => Recipients::Users(ids),
        })
    }
}

impl Recipients {
    pub fn all() -> Self {
        Recipients::All("all".to_string())
    }

    pub fn users<I: IntoIterator<Item = S>, S: Into<String>>(ids: I) -> Self {
        Recipients::Users(ids.into_iter().map(Into::into).collect())
    }

    /// Whether `user` is addressed by this notification.
    pub fn targets(&self, user: &str) -> bool {
        match self {
            Recipients::All(_) => true,
            Recipients::Users(ids) => ids.iter().any(|id| id == user),
        }
    }
}

impl Default for Recipients {
    fn default() -> Self {
        Recipients::all()
    }
}

/// A notification record.
///
/// Broadcast ("all") notifications cannot carry one shared read flag, so
/// per-user read receipts back the unread count; the scalar `read` flag is
/// kept for single-recipient records and older snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub recipients: Recipients,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub read: bool,
    /// Users that have marked this notification read
    #[serde(default)]
    pub read_by: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Whether `user` should count this notification as unread.
    pub fn unread_for(&self, user: &str) -> bool {
        self.recipients.targets(user) && !self.read && !self.read_by.contains(user)
    }

    /// Record that `user` has read this notification.
    ///
    /// Single-recipient records flip the scalar flag too; broadcast records
    /// only gain a read receipt so other users still see them as unread.
    pub fn mark_read_by(&mut self, user: &str) {
        self.read_by.insert(user.to_string());
        if let Recipients::Users(ids) = &self.recipients {
            if ids.iter().all(|id| self.read_by.contains(id)) {
                self.read = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn broadcast(id: &str) -> Notification {
        Notification {
            id: id.to_string(),
            title: "Announcement".to_string(),
            message: String::new(),
            recipients: Recipients::all(),
            project_id: None,
            read: false,
            read_by: BTreeSet::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_broadcast_read_is_per_user() {
        let mut n = broadcast("N1");
        assert!(n.unread_for("U1"));
        assert!(n.unread_for("U2"));

        n.mark_read_by("U1");
        assert!(!n.unread_for("U1"));
        assert!(n.unread_for("U2")); // U2's unread count is unaffected
    }

    #[test]
    fn test_single_recipient_flips_scalar_flag() {
        let mut n = broadcast("N2");
        n.recipients = Recipients::users(["U1"]);
        n.mark_read_by("U1");
        assert!(n.read);
    }

    #[test]
    fn test_wire_sentinel_all_deserializes() {
        let n: Notification = serde_json::from_value(serde_json::json!({
            "id": "N3",
            "title": "t",
            "recipients": "all",
            "created_at": Utc::now(),
        }))
        .unwrap();
        assert!(n.recipients.targets("anyone"));
    }

    #[test]
    fn test_bare_non_sentinel_string_is_a_single_user_not_a_broadcast() {
        let r: Recipients = serde_json::from_value(serde_json::json!("U1")).unwrap();
        assert_eq!(r, Recipients::users(["U1"]));
        assert!(r.targets("U1"));
        assert!(!r.targets("U2"));
    }
}
