//! Generic per-entity repository.
//!
//! Every operation tries the remote service first (when credentials are
//! held) and falls back to the year-scoped local snapshot on transient
//! failure. Successful remote results are mirrored into the snapshot so the
//! next offline session starts from the freshest data the client ever saw.
//!
//! In-memory state is last-writer-wins; callers serialize mutations whose
//! order matters (e.g. a status change before a dependent milestone write).

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use super::Collection;
use crate::remote::{self, dto, Method, RemoteClient, RemoteError};
use crate::store::{self, LocalStore};
use crate::types::{GatewayError, Result};

/// Shallow-merge `patch`'s top-level fields into `target`.
///
/// Only the named fields change; everything else is untouched.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    if let (Value::Object(target), Value::Object(patch)) = (target, patch) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// Hybrid repository for one entity collection.
///
/// The in-memory copy is tagged with the year it was loaded for, so an
/// operation naming a different year never uses it as a mutation base.
pub struct Repository<C: Collection> {
    client: RemoteClient,
    store: Arc<dyn LocalStore>,
    memory: RwLock<(String, Vec<C>)>,
}

impl<C: Collection> Repository<C> {
    pub fn new(client: RemoteClient, store: Arc<dyn LocalStore>) -> Self {
        Self {
            client,
            store,
            memory: RwLock::new((String::new(), Vec::new())),
        }
    }

    /// The in-memory copy handed to the UI.
    pub async fn current(&self) -> Vec<C> {
        self.memory.read().await.1.clone()
    }

    /// Look up one item by domain id in the in-memory copy.
    pub async fn get(&self, id: &str) -> Option<C> {
        self.memory
            .read()
            .await
            .1
            .iter()
            .find(|c| c.id() == id)
            .cloned()
    }

    /// Drop all in-memory state (year switch teardown).
    pub async fn clear(&self) {
        let mut memory = self.memory.write().await;
        memory.0.clear();
        memory.1.clear();
    }

    fn year_query(year: &str) -> Vec<(String, String)> {
        vec![("year".to_string(), year.to_string())]
    }

    /// Persist `items` as the year's snapshot and replace in-memory state.
    ///
    /// The store write happens first: a quota failure leaves memory (and the
    /// previous snapshot) untouched, so a failed mutation applies nothing.
    async fn commit(&self, year: &str, items: Vec<C>) -> Result<Vec<C>> {
        let key = store::collection_key(C::NAME, year);
        store::write_json(self.store.as_ref(), &key, &items)?;
        *self.memory.write().await = (year.to_string(), items.clone());
        Ok(items)
    }

    /// Read the year's snapshot, or the built-in default when absent.
    fn snapshot(&self, year: &str) -> Vec<C> {
        let key = store::collection_key(C::NAME, year);
        store::read_json(self.store.as_ref(), &key).unwrap_or_else(C::defaults)
    }

    /// Load the whole collection for a year, fully replacing in-memory
    /// state (no merge).
    pub async fn load_all(&self, year: &str) -> Result<Vec<C>> {
        if self.client.auth().has_credentials().await {
            match self
                .client
                .request(
                    Method::Get,
                    &remote::collection_path(C::NAME),
                    &Self::year_query(year),
                    None,
                )
                .await
            {
                Ok(value) => {
                    let items: Vec<C> = dto::list_items(&value)
                        .iter()
                        .filter_map(C::from_remote)
                        .collect();
                    return self.commit(year, items).await;
                }
                Err(RemoteError::Validation(m)) => return Err(GatewayError::Validation(m)),
                Err(e) => debug!("{} load falling back to local: {}", C::NAME, e),
            }
        }
        let items = self.snapshot(year);
        *self.memory.write().await = (year.to_string(), items.clone());
        Ok(items)
    }

    /// Create an item. Remote success appends the server's representation;
    /// transient failure appends the caller's item (generating a local id
    /// when it has none). Validation errors propagate and write nothing.
    pub async fn add(&self, year: &str, mut item: C) -> Result<Vec<C>> {
        if self.client.auth().has_credentials().await {
            let payload = serde_json::to_value(&item)?;
            match self
                .client
                .request(
                    Method::Post,
                    &remote::collection_path(C::NAME),
                    &Self::year_query(year),
                    Some(payload),
                )
                .await
            {
                Ok(value) => {
                    let created = C::from_remote(&value).unwrap_or(item);
                    let mut items = self.current_or_snapshot(year).await;
                    items.push(created);
                    return self.commit(year, items).await;
                }
                Err(RemoteError::Validation(m)) => return Err(GatewayError::Validation(m)),
                Err(RemoteError::AuthExpired) => return Err(GatewayError::SessionExpired),
                Err(e) => debug!("{} create falling back to local: {}", C::NAME, e),
            }
        }

        if item.id().is_empty() {
            item.set_id(Uuid::new_v4().to_string());
        }
        let mut items = self.current_or_snapshot(year).await;
        items.push(item);
        self.commit(year, items).await
    }

    /// Replace an item by id, remote-then-local.
    pub async fn update(&self, year: &str, item: C) -> Result<Vec<C>> {
        let replacement = if self.client.auth().has_credentials().await {
            let payload = serde_json::to_value(&item)?;
            match self
                .client
                .request(
                    Method::Put,
                    &remote::resource_path(C::NAME, item.id()),
                    &Self::year_query(year),
                    Some(payload),
                )
                .await
            {
                Ok(value) => C::from_remote(&value).unwrap_or(item),
                Err(RemoteError::Validation(m)) => return Err(GatewayError::Validation(m)),
                Err(RemoteError::AuthExpired) => return Err(GatewayError::SessionExpired),
                Err(e) => {
                    debug!("{} update falling back to local: {}", C::NAME, e);
                    item
                }
            }
        } else {
            item
        };

        let mut items = self.current_or_snapshot(year).await;
        match items.iter_mut().find(|c| c.id() == replacement.id()) {
            Some(slot) => *slot = replacement,
            None => items.push(replacement),
        }
        self.commit(year, items).await
    }

    /// Apply a partial field set to each of `ids`, remote-then-local per id.
    ///
    /// Exactly the patch's named fields change on exactly the named items.
    pub async fn bulk_update(&self, year: &str, ids: &[String], patch: &Value) -> Result<Vec<C>> {
        let signed_in = self.client.auth().has_credentials().await;
        let mut items = self.current_or_snapshot(year).await;

        for id in ids {
            let mut server_rep: Option<C> = None;
            if signed_in {
                match self
                    .client
                    .request(
                        Method::Patch,
                        &remote::resource_path(C::NAME, id),
                        &Self::year_query(year),
                        Some(patch.clone()),
                    )
                    .await
                {
                    Ok(value) => server_rep = C::from_remote(&value),
                    Err(RemoteError::Validation(m)) => return Err(GatewayError::Validation(m)),
                    Err(RemoteError::AuthExpired) => return Err(GatewayError::SessionExpired),
                    Err(e) => debug!("{} patch {} falling back to local: {}", C::NAME, id, e),
                }
            }

            if let Some(slot) = items.iter_mut().find(|c| c.id() == *id) {
                match server_rep {
                    Some(rep) => *slot = rep,
                    None => apply_patch_locally(slot, patch),
                }
            }
        }

        self.commit(year, items).await
    }

    /// Remove one item. The local snapshot is filtered regardless of the
    /// remote outcome: once the caller decided to delete, the item is gone
    /// locally even if the backend was unreachable.
    pub async fn remove(&self, year: &str, id: &str) -> Result<Vec<C>> {
        if self.client.auth().has_credentials().await {
            if let Err(e) = self
                .client
                .request(
                    Method::Delete,
                    &remote::resource_path(C::NAME, id),
                    &Self::year_query(year),
                    None,
                )
                .await
            {
                warn!("{} remote delete of {} failed: {}", C::NAME, id, e);
            }
        }
        let mut items = self.current_or_snapshot(year).await;
        items.retain(|c| c.id() != id);
        self.commit(year, items).await
    }

    /// Remove several items; same optimistic-local policy as `remove`.
    pub async fn bulk_remove(&self, year: &str, ids: &[String]) -> Result<Vec<C>> {
        if self.client.auth().has_credentials().await {
            for id in ids {
                if let Err(e) = self
                    .client
                    .request(
                        Method::Delete,
                        &remote::resource_path(C::NAME, id),
                        &Self::year_query(year),
                        None,
                    )
                    .await
                {
                    warn!("{} remote delete of {} failed: {}", C::NAME, id, e);
                }
            }
        }
        let mut items = self.current_or_snapshot(year).await;
        items.retain(|c| !ids.iter().any(|id| id == c.id()));
        self.commit(year, items).await
    }

    /// Mutation base state: the in-memory copy when it was loaded for this
    /// year, else the year's local snapshot (mutating without a prior load,
    /// or naming a year other than the loaded one).
    async fn current_or_snapshot(&self, year: &str) -> Vec<C> {
        let memory = self.memory.read().await;
        if memory.0 == year {
            memory.1.clone()
        } else {
            self.snapshot(year)
        }
    }
}

/// Patch one item in place via its JSON form; undecodable results keep the
/// original item rather than corrupting the collection.
fn apply_patch_locally<C: Collection>(item: &mut C, patch: &Value) {
    let Ok(mut json) = serde_json::to_value(&*item) else {
        return;
    };
    merge_patch(&mut json, patch);
    match serde_json::from_value(json) {
        Ok(patched) => *item = patched,
        Err(e) => warn!("{} patch produced undecodable item: {}", C::NAME, e),
    }
}
