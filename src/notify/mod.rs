//! Notification delivery.
//!
//! Maintains the signed-in user's notification list and keeps it live:
//!
//! - initial load follows the same remote-then-local pattern as the
//!   collection repositories
//! - a best-effort WebSocket channel pushes new notifications and full list
//!   snapshots into the same in-memory list (duplicate ids suppressed)
//! - read-state mutations are optimistic: local state flips immediately and
//!   the remote acknowledgement is fire-and-forget

pub mod channel;

pub use channel::{ChannelHandle, ReconnectPolicy};

use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::model::Notification;
use crate::remote::{self, dto, Method, RemoteClient, RemoteError};
use crate::store::{self, LocalStore};
use crate::types::{GatewayError, Result};

/// Event pushed over the realtime channel.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    /// One new notification
    Notification { data: Value },
    /// Full list snapshot (also used for bulk read-state updates)
    Snapshot { data: Vec<Value> },
}

/// The signed-in user's live notification list.
pub struct NotificationFeed {
    user: String,
    client: RemoteClient,
    store: Arc<dyn LocalStore>,
    items: RwLock<Vec<Notification>>,
    year: RwLock<String>,
}

impl NotificationFeed {
    pub fn new(user: &str, client: RemoteClient, store: Arc<dyn LocalStore>) -> Self {
        Self {
            user: user.to_string(),
            client,
            store,
            items: RwLock::new(Vec::new()),
            year: RwLock::new(String::new()),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Current list copy.
    pub async fn current(&self) -> Vec<Notification> {
        self.items.read().await.clone()
    }

    /// Unread count for the signed-in user.
    pub async fn unread_count(&self) -> usize {
        self.items
            .read()
            .await
            .iter()
            .filter(|n| n.unread_for(&self.user))
            .count()
    }

    /// Load the year's notifications, remote-then-local, fully replacing
    /// in-memory state.
    pub async fn load(&self, year: &str) -> Result<Vec<Notification>> {
        *self.year.write().await = year.to_string();

        if self.client.auth().has_credentials().await {
            match self
                .client
                .request(
                    Method::Get,
                    &remote::collection_path("notifications"),
                    &[("year".to_string(), year.to_string())],
                    None,
                )
                .await
            {
                Ok(value) => {
                    let items: Vec<Notification> = dto::list_items(&value)
                        .iter()
                        .filter_map(dto::notification_from_remote)
                        .collect();
                    self.replace(items.clone()).await?;
                    return Ok(items);
                }
                Err(RemoteError::Validation(m)) => return Err(GatewayError::Validation(m)),
                Err(e) => debug!("Notification load falling back to local: {}", e),
            }
        }

        let key = store::collection_key("notifications", year);
        let items: Vec<Notification> =
            store::read_json(self.store.as_ref(), &key).unwrap_or_default();
        *self.items.write().await = items.clone();
        Ok(items)
    }

    /// Apply one realtime event. Duplicate delivery of the same id is a
    /// no-op.
    pub async fn apply_event(&self, event: FeedEvent) {
        match event {
            FeedEvent::Notification { data } => {
                let Some(notification) = dto::notification_from_remote(&data) else {
                    warn!("Dropping undecodable realtime notification");
                    return;
                };
                {
                    let mut items = self.items.write().await;
                    if items.iter().any(|n| n.id == notification.id) {
                        debug!("Suppressing duplicate notification {}", notification.id);
                        return;
                    }
                    items.push(notification);
                }
                self.persist().await;
            }
            FeedEvent::Snapshot { data } => {
                let mut items: Vec<Notification> = Vec::new();
                for value in &data {
                    if let Some(n) = dto::notification_from_remote(value) {
                        if !items.iter().any(|seen| seen.id == n.id) {
                            items.push(n);
                        }
                    }
                }
                *self.items.write().await = items;
                self.persist().await;
            }
        }
    }

    /// Mark one notification read for this user. Optimistic: the local flip
    /// is immediate and the remote acknowledgement is fire-and-forget.
    pub async fn mark_one(&self, id: &str) {
        {
            let mut items = self.items.write().await;
            if let Some(n) = items.iter_mut().find(|n| n.id == id) {
                n.mark_read_by(&self.user);
            }
        }
        self.persist().await;
        self.ack(remote::resource_path("notifications", id) + "read/")
            .await;
    }

    /// Mark everything addressed to this user read. Broadcast ("all")
    /// notifications gain a read receipt for this user only; other users'
    /// unread counts are unaffected.
    pub async fn mark_all_for_user(&self) {
        let user = self.user.clone();
        {
            let mut items = self.items.write().await;
            for n in items.iter_mut() {
                if n.recipients.targets(&user) {
                    n.mark_read_by(&user);
                }
            }
        }
        self.persist().await;
        self.ack("/api/notifications/read_all/".to_string()).await;
    }

    /// Fire-and-forget remote acknowledgement; failure never rolls back the
    /// optimistic flip.
    async fn ack(&self, path: String) {
        if !self.client.auth().has_credentials().await {
            return;
        }
        let client = self.client.clone();
        let year = self.year.read().await.clone();
        tokio::spawn(async move {
            if let Err(e) = client
                .request(
                    Method::Post,
                    &path,
                    &[("year".to_string(), year)],
                    None,
                )
                .await
            {
                debug!("Read-state ack failed (ignored): {}", e);
            }
        });
    }

    async fn replace(&self, items: Vec<Notification>) -> Result<()> {
        *self.items.write().await = items;
        self.persist_strict().await
    }

    /// Mirror the in-memory list to the local snapshot, ignoring quota
    /// failures (the live list is still correct for this session).
    async fn persist(&self) {
        if let Err(e) = self.persist_strict().await {
            warn!("Notification snapshot write failed: {}", e);
        }
    }

    async fn persist_strict(&self) -> Result<()> {
        let year = self.year.read().await.clone();
        if year.is_empty() {
            return Ok(());
        }
        let key = store::collection_key("notifications", &year);
        let items = self.items.read().await.clone();
        store::write_json(self.store.as_ref(), &key, &items)
    }
}
