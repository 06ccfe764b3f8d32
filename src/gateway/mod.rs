//! Hybrid Data Gateway.
//!
//! One uniform create/read/update/delete/bulk surface per entity collection,
//! preferring the remote REST backend and falling back to the year-scoped
//! local snapshot. The gateway is the sole writer of the local store; the
//! in-memory copies it hands out are the caller's to render.
//!
//! ```text
//! caller ──► Repository ──► RemoteClient ──► backend
//!                │   ▲           │
//!                │   └── mirror ◄┘ (success)
//!                ▼
//!            LocalStore  (fallback on transient failure / signed out)
//! ```
//!
//! Transient remote failures never surface here; only validation errors,
//! session expiry on mutations, and local quota errors propagate.

pub mod entities;
pub mod repo;
pub mod year;

pub use repo::{merge_patch, Repository};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::AuthState;
use crate::config::GatewayConfig;
use crate::model::{
    Advisor, Classroom, LogEntry, Major, Milestone, MilestoneTemplate, Notification, Project,
    ProjectStatus, Recipients, SettingsKind, Student,
};
use crate::remote::{self, Method, RemoteClient, RemoteError};
use crate::store::{self, LocalStore};
use crate::types::{GatewayError, Result};

/// An entity collection the gateway manages.
///
/// `NAME` doubles as the REST endpoint segment and the local key prefix.
pub trait Collection:
    Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const NAME: &'static str;

    /// Domain identifier (institution-issued or locally generated).
    fn id(&self) -> &str;

    /// Assign a locally generated identifier (offline create of an item the
    /// caller left without one).
    fn set_id(&mut self, id: String);

    /// Tolerant translation from the server's wire shape. `None` means the
    /// record is unusable and is skipped, never that the load fails.
    fn from_remote(value: &Value) -> Option<Self>;

    /// Built-in collection returned when neither the remote nor a local
    /// snapshot has data for a year.
    fn defaults() -> Vec<Self> {
        Vec::new()
    }
}

/// The hybrid gateway: one repository per entity collection plus settings,
/// year-partition management, and file blob storage.
pub struct HybridGateway {
    config: GatewayConfig,
    client: RemoteClient,
    store: Arc<dyn LocalStore>,
    active_year: RwLock<String>,

    pub students: Repository<Student>,
    pub advisors: Repository<Advisor>,
    pub projects: Repository<Project>,
    pub majors: Repository<Major>,
    pub classrooms: Repository<Classroom>,
    pub notifications: Repository<Notification>,
}

impl HybridGateway {
    /// Assemble a gateway over the given transport and store.
    pub fn new(
        config: GatewayConfig,
        client: RemoteClient,
        store: Arc<dyn LocalStore>,
        initial_year: &str,
    ) -> Self {
        Self {
            students: Repository::new(client.clone(), Arc::clone(&store)),
            advisors: Repository::new(client.clone(), Arc::clone(&store)),
            projects: Repository::new(client.clone(), Arc::clone(&store)),
            majors: Repository::new(client.clone(), Arc::clone(&store)),
            classrooms: Repository::new(client.clone(), Arc::clone(&store)),
            notifications: Repository::new(client.clone(), Arc::clone(&store)),
            config,
            client,
            store,
            active_year: RwLock::new(initial_year.to_string()),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn auth(&self) -> &Arc<AuthState> {
        self.client.auth()
    }

    pub fn store(&self) -> &Arc<dyn LocalStore> {
        &self.store
    }

    /// Currently active academic year.
    pub async fn active_year(&self) -> String {
        self.active_year.read().await.clone()
    }

    /// Switch the active year: full teardown and reload.
    ///
    /// Every in-memory collection is cleared before anything is loaded, so a
    /// failed reload leaves no stale cross-year state behind.
    pub async fn switch_year(&self, year: &str) -> Result<()> {
        info!("Switching active year to {}", year);
        *self.active_year.write().await = year.to_string();

        self.students.clear().await;
        self.advisors.clear().await;
        self.projects.clear().await;
        self.majors.clear().await;
        self.classrooms.clear().await;
        self.notifications.clear().await;

        self.students.load_all(year).await?;
        self.advisors.load_all(year).await?;
        self.projects.load_all(year).await?;
        self.majors.load_all(year).await?;
        self.classrooms.load_all(year).await?;
        self.notifications.load_all(year).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Years
    // ------------------------------------------------------------------

    /// Known academic years, newest last.
    pub async fn list_years(&self) -> Vec<String> {
        if self.auth().has_credentials().await {
            match self
                .client
                .request(Method::Get, remote::YEARS_PATH, &[], None)
                .await
            {
                Ok(value) => {
                    let years: Vec<String> = remote::dto::list_items(&value)
                        .iter()
                        .filter_map(|v| match v {
                            Value::String(s) => Some(s.clone()),
                            Value::Object(o) => o
                                .get("year")
                                .and_then(|y| y.as_str())
                                .map(|s| s.to_string()),
                            _ => None,
                        })
                        .collect();
                    if !years.is_empty() {
                        let _ = store::write_json(self.store.as_ref(), store::YEARS_KEY, &years);
                        return years;
                    }
                }
                Err(e) => debug!("Year list fetch failed, using local: {}", e),
            }
        }
        match store::read_json(self.store.as_ref(), store::YEARS_KEY) {
            Some(years) => years,
            None => vec![self.active_year.read().await.clone()],
        }
    }

    /// Create the next academic year and make it selectable.
    ///
    /// Remote first; in fallback the next sequential year is derived from
    /// the latest known one. Previous years' snapshots are untouched either
    /// way.
    pub async fn create_year(&self) -> Result<String> {
        let mut years = self.list_years().await;
        let candidate = year::next_year(years.last().map(String::as_str));

        if self.auth().has_credentials().await {
            match self
                .client
                .request(
                    Method::Post,
                    remote::YEARS_PATH,
                    &[],
                    Some(serde_json::json!({ "year": candidate })),
                )
                .await
            {
                Ok(value) => {
                    let created = value
                        .get("year")
                        .and_then(|y| y.as_str())
                        .unwrap_or(&candidate)
                        .to_string();
                    years.push(created.clone());
                    store::write_json(self.store.as_ref(), store::YEARS_KEY, &years)?;
                    info!("Created academic year {}", created);
                    return Ok(created);
                }
                Err(RemoteError::Validation(m)) => return Err(GatewayError::Validation(m)),
                Err(RemoteError::AuthExpired) => return Err(GatewayError::SessionExpired),
                Err(e) => warn!("Remote year creation failed, deriving locally: {}", e),
            }
        }

        years.push(candidate.clone());
        store::write_json(self.store.as_ref(), store::YEARS_KEY, &years)?;
        info!("Derived academic year {} locally", candidate);
        Ok(candidate)
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    /// Load a settings blob for a year, remote-then-local-then-default.
    pub async fn load_settings<T>(&self, year: &str, kind: SettingsKind) -> T
    where
        T: Serialize + DeserializeOwned + Default,
    {
        if self.auth().has_credentials().await {
            match self
                .client
                .request(
                    Method::Get,
                    &remote::settings_path(kind),
                    &[("year".to_string(), year.to_string())],
                    None,
                )
                .await
            {
                Ok(value) => {
                    if let Ok(settings) = serde_json::from_value::<T>(value) {
                        let key = store::settings_key(kind, year);
                        let _ = store::write_json(self.store.as_ref(), &key, &settings);
                        return settings;
                    }
                }
                Err(e) => debug!("Settings {} fetch failed, using local: {}", kind, e),
            }
        }
        store::read_json(self.store.as_ref(), &store::settings_key(kind, year))
            .unwrap_or_default()
    }

    /// Write a settings blob, remote first, mirrored locally either way.
    pub async fn update_settings<T>(&self, year: &str, kind: SettingsKind, value: T) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        if self.auth().has_credentials().await {
            let payload = serde_json::to_value(&value)?;
            match self
                .client
                .request(
                    Method::Put,
                    &remote::settings_path(kind),
                    &[("year".to_string(), year.to_string())],
                    Some(payload),
                )
                .await
            {
                Ok(_) => {}
                Err(RemoteError::Validation(m)) => return Err(GatewayError::Validation(m)),
                Err(RemoteError::AuthExpired) => return Err(GatewayError::SessionExpired),
                Err(e) => debug!("Settings {} push failed, keeping local copy: {}", kind, e),
            }
        }
        store::write_json(self.store.as_ref(), &store::settings_key(kind, year), &value)?;
        Ok(value)
    }

    // ------------------------------------------------------------------
    // File blobs
    // ------------------------------------------------------------------

    /// Store a binary attachment as a data URL under `file_<id>`.
    ///
    /// Returns the generated file id. Quota failures surface immediately and
    /// apply nothing.
    pub fn store_file(&self, mime: &str, bytes: &[u8]) -> Result<String> {
        use base64::Engine as _;
        let file_id = Uuid::new_v4().to_string();
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        let data_url = format!("data:{};base64,{}", mime, encoded);
        self.store.set_raw(&store::file_key(&file_id), &data_url)?;
        Ok(file_id)
    }

    /// Read a stored attachment back as (mime, bytes).
    pub fn load_file(&self, file_id: &str) -> Option<(String, Vec<u8>)> {
        use base64::Engine as _;
        let data_url = self.store.get_raw(&store::file_key(file_id))?;
        let rest = data_url.strip_prefix("data:")?;
        let (mime, payload) = rest.split_once(";base64,")?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .ok()?;
        Some((mime.to_string(), bytes))
    }

    /// Delete a stored attachment.
    pub fn remove_file(&self, file_id: &str) {
        self.store.remove(&store::file_key(file_id));
    }

    // ------------------------------------------------------------------
    // Domain operations on projects
    // ------------------------------------------------------------------

    /// Transition a project's status, appending to its history.
    ///
    /// Approval stamps the milestone list out of the year's template
    /// (cumulative due-date offsets from the approval date) and a
    /// notification record is appended for the group.
    pub async fn change_project_status(
        &self,
        year: &str,
        project_id: &str,
        status: ProjectStatus,
        by: &str,
        note: &str,
    ) -> Result<Vec<Project>> {
        let Some(mut project) = self.projects.get(project_id).await else {
            return Err(GatewayError::Validation(format!(
                "Unknown project {}",
                project_id
            )));
        };

        project.push_status(status, by, note);
        if status == ProjectStatus::Approved && project.milestones.is_empty() {
            let template: MilestoneTemplate =
                self.load_settings(year, SettingsKind::MilestoneTemplate).await;
            project.milestones = template.instantiate(chrono::Utc::now());
        }

        let collection = self.projects.update(year, project.clone()).await?;
        self.emit_notification(
            year,
            &format!("Project status changed: {:?}", status),
            note,
            Recipients::users(project.group.clone()),
            Some(project_id),
        )
        .await?;
        Ok(collection)
    }

    /// Append a communication log entry to a project, emitting notification
    /// records for any `@user` mentions in message text.
    pub async fn append_project_log(
        &self,
        year: &str,
        project_id: &str,
        entry: LogEntry,
    ) -> Result<Vec<Project>> {
        let Some(mut project) = self.projects.get(project_id).await else {
            return Err(GatewayError::Validation(format!(
                "Unknown project {}",
                project_id
            )));
        };

        let mentions = match &entry {
            LogEntry::Message { text, from, .. } => mentioned_users(text, from),
            LogEntry::Event { .. } => Vec::new(),
        };

        project.push_log(entry);
        let collection = self.projects.update(year, project).await?;

        if !mentions.is_empty() {
            self.emit_notification(
                year,
                "You were mentioned",
                &format!("New message on project {}", project_id),
                Recipients::users(mentions),
                Some(project_id),
            )
            .await?;
        }
        Ok(collection)
    }

    /// Attach a submission blob to a project milestone by index.
    pub async fn submit_milestone(
        &self,
        year: &str,
        project_id: &str,
        milestone_index: usize,
        mime: &str,
        bytes: &[u8],
    ) -> Result<Vec<Project>> {
        let Some(mut project) = self.projects.get(project_id).await else {
            return Err(GatewayError::Validation(format!(
                "Unknown project {}",
                project_id
            )));
        };
        if milestone_index >= project.milestones.len() {
            return Err(GatewayError::Validation(format!(
                "Project {} has no milestone {}",
                project_id, milestone_index
            )));
        }

        // Quota failure aborts before the project record is touched
        let file_id = self.store_file(mime, bytes)?;
        let milestone: &mut Milestone = &mut project.milestones[milestone_index];
        milestone.submission_file = Some(file_id);
        milestone.status = crate::model::MilestoneStatus::Submitted;
        self.projects.update(year, project).await
    }

    /// Append a notification record for a domain event.
    async fn emit_notification(
        &self,
        year: &str,
        title: &str,
        message: &str,
        recipients: Recipients,
        project_id: Option<&str>,
    ) -> Result<()> {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            message: message.to_string(),
            recipients,
            project_id: project_id.map(|p| p.to_string()),
            read: false,
            read_by: Default::default(),
            created_at: chrono::Utc::now(),
        };
        self.notifications.add(year, notification).await?;
        Ok(())
    }
}

/// Extract `@user` mentions from message text, excluding the author.
fn mentioned_users(text: &str, author: &str) -> Vec<String> {
    text.split_whitespace()
        .filter_map(|word| word.strip_prefix('@'))
        .map(|id| id.trim_end_matches(|c: char| ".,;:!?)".contains(c)).to_string())
        .filter(|id| !id.is_empty() && id != author)
        .collect()
}
