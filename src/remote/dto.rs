//! Wire shapes and their translation to canonical models.
//!
//! The backend and the local store disagree on field names and types:
//! numeric surrogate ids next to string domain ids, nested major objects
//! where the canonical model keeps a flat name, snake_case field spellings.
//! Every read path goes through these translations before touching
//! in-memory state. The translations are idempotent (canonical JSON decodes
//! to the same model via serde aliases) and default rather than throw on
//! partially-missing fields.

use serde::Deserialize;
use serde_json::Value;

use crate::model::{
    Advisor, AdvisorQuota, ApprovalStatus, Classroom, Major, Notification, Project, Student,
};

/// Unwrap a list response: either a bare JSON array or a DRF-style
/// `{"count": n, "results": [...]}` page.
pub fn list_items(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Object(map) => map
            .get("results")
            .and_then(|r| r.as_array())
            .cloned()
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Nested major reference as the server sends it (`{"id": 3, "name": "SE"}`).
#[derive(Debug, Deserialize, Default)]
pub struct MajorRef {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: String,
}

/// Either the server's nested object or the canonical flat string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MajorField {
    Flat(String),
    Nested(MajorRef),
}

impl MajorField {
    fn into_name(self) -> String {
        match self {
            MajorField::Flat(name) => name,
            MajorField::Nested(r) => r.name,
        }
    }
}

impl Default for MajorField {
    fn default() -> Self {
        MajorField::Flat(String::new())
    }
}

/// Server id fields are sometimes numeric; the domain uses strings.
fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct StudentDto {
    /// Institution-issued domain id; the server also sends a numeric `pk`
    /// which is ignored here
    #[serde(default, alias = "id")]
    pub student_id: Value,
    #[serde(default, alias = "name")]
    pub full_name: String,
    #[serde(default)]
    pub major: MajorField,
    #[serde(default, alias = "classroom")]
    pub class_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "phone")]
    pub phone_number: String,
    #[serde(default, alias = "approved")]
    pub approval_status: ApprovalStatus,
    #[serde(default, alias = "mustChangePassword")]
    pub must_change_password: bool,
}

impl StudentDto {
    pub fn into_model(self) -> Student {
        Student {
            id: id_string(&self.student_id),
            name: self.full_name,
            major: self.major.into_name(),
            classroom: self.class_name,
            email: self.email,
            phone: self.phone_number,
            approved: self.approval_status,
            must_change_password: self.must_change_password,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct AdvisorDto {
    #[serde(default, alias = "id")]
    pub advisor_id: Value,
    #[serde(default, alias = "name")]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub quota: Option<AdvisorQuota>,
    #[serde(default, alias = "specializations")]
    pub majors: Vec<Value>,
    #[serde(default)]
    pub is_admin: bool,
}

impl AdvisorDto {
    pub fn into_model(self) -> Advisor {
        Advisor {
            id: id_string(&self.advisor_id),
            name: self.full_name,
            email: self.email,
            quota: self.quota.unwrap_or_default(),
            specializations: self.majors.iter().map(id_string).collect(),
            is_admin: self.is_admin,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct MajorDto {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: String,
}

impl MajorDto {
    pub fn into_model(self) -> Major {
        Major {
            id: id_string(&self.id),
            name: self.name,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ClassroomDto {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "major_id")]
    pub major: Value,
}

impl ClassroomDto {
    pub fn into_model(self) -> Classroom {
        Classroom {
            id: id_string(&self.id),
            name: self.name,
            major_id: id_string(&self.major),
        }
    }
}

/// Projects already travel in near-canonical shape; only the id needs the
/// numeric-to-string normalization, so decode leniently through the model
/// itself after normalizing.
pub fn project_from_remote(value: &Value) -> Option<Project> {
    let mut value = value.clone();
    if let Some(obj) = value.as_object_mut() {
        if let Some(id) = obj.get("id") {
            let id = id_string(id);
            obj.insert("id".to_string(), Value::String(id));
        }
    }
    serde_json::from_value(value).ok()
}

pub fn notification_from_remote(value: &Value) -> Option<Notification> {
    let mut value = value.clone();
    if let Some(obj) = value.as_object_mut() {
        if let Some(id) = obj.get("id") {
            let id = id_string(id);
            obj.insert("id".to_string(), Value::String(id));
        }
    }
    serde_json::from_value(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_student_server_shape_flattens() {
        let dto: StudentDto = serde_json::from_value(json!({
            "student_id": 4101,
            "full_name": "Nguyen Van An",
            "major": { "id": 3, "name": "Software Engineering" },
            "class_name": "SE-01",
            "approval_status": "approved"
        }))
        .unwrap();
        let s = dto.into_model();
        assert_eq!(s.id, "4101");
        assert_eq!(s.major, "Software Engineering");
        assert_eq!(s.approved, ApprovalStatus::Approved);
        assert_eq!(s.email, ""); // missing fields default
    }

    #[test]
    fn test_student_translation_is_idempotent() {
        let canonical = json!({
            "id": "155N0001/21",
            "name": "An",
            "major": "SE",
            "classroom": "SE-01",
            "approved": "pending",
            "must_change_password": true
        });
        let dto: StudentDto = serde_json::from_value(canonical.clone()).unwrap();
        let model = dto.into_model();
        assert_eq!(model.id, "155N0001/21");
        assert_eq!(model.major, "SE");
        assert!(model.must_change_password);

        // Round-tripping the canonical form changes nothing
        let again: StudentDto =
            serde_json::from_value(serde_json::to_value(&model).unwrap()).unwrap();
        assert_eq!(again.into_model(), model);
    }

    #[test]
    fn test_list_items_handles_paged_and_bare() {
        let bare = json!([{"id": 1}]);
        let paged = json!({"count": 1, "results": [{"id": 1}]});
        assert_eq!(list_items(&bare).len(), 1);
        assert_eq!(list_items(&paged).len(), 1);
        assert!(list_items(&json!(null)).is_empty());
    }
}
