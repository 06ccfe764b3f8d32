//! `Collection` implementations for the domain entities.

use serde_json::Value;

use super::Collection;
use crate::model::{Advisor, Classroom, Major, Notification, Project, Student};
use crate::remote::dto;

impl Collection for Student {
    const NAME: &'static str = "students";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn from_remote(value: &Value) -> Option<Self> {
        serde_json::from_value::<dto::StudentDto>(value.clone())
            .ok()
            .map(dto::StudentDto::into_model)
    }
}

impl Collection for Advisor {
    const NAME: &'static str = "advisors";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn from_remote(value: &Value) -> Option<Self> {
        serde_json::from_value::<dto::AdvisorDto>(value.clone())
            .ok()
            .map(dto::AdvisorDto::into_model)
    }
}

impl Collection for Project {
    const NAME: &'static str = "projects";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn from_remote(value: &Value) -> Option<Self> {
        dto::project_from_remote(value)
    }
}

impl Collection for Major {
    const NAME: &'static str = "majors";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn from_remote(value: &Value) -> Option<Self> {
        serde_json::from_value::<dto::MajorDto>(value.clone())
            .ok()
            .map(dto::MajorDto::into_model)
    }

    /// The institution's standing majors; shown before any sync has
    /// happened so registration forms are never empty.
    fn defaults() -> Vec<Self> {
        ["Information Technology", "Software Engineering", "Information Systems"]
            .iter()
            .enumerate()
            .map(|(i, name)| Major {
                id: (i + 1).to_string(),
                name: name.to_string(),
            })
            .collect()
    }
}

impl Collection for Classroom {
    const NAME: &'static str = "classrooms";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn from_remote(value: &Value) -> Option<Self> {
        serde_json::from_value::<dto::ClassroomDto>(value.clone())
            .ok()
            .map(dto::ClassroomDto::into_model)
    }
}

impl Collection for Notification {
    const NAME: &'static str = "notifications";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn from_remote(value: &Value) -> Option<Self> {
        dto::notification_from_remote(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unusable_remote_record_is_skipped_not_fatal() {
        assert!(Student::from_remote(&json!("not an object")).is_none());
        assert!(Project::from_remote(&json!(42)).is_none());
    }

    #[test]
    fn test_major_defaults_nonempty() {
        assert!(!Major::defaults().is_empty());
    }
}
