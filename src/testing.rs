//! Test fixtures: fake transports standing in for the REST backend.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

use crate::auth::{AuthState, SessionTokens};
use crate::remote::{Method, RemoteClient, RemoteError, RemoteTransport};

/// Transport for which every call is a network failure.
pub struct UnreachableTransport;

#[async_trait]
impl RemoteTransport for UnreachableTransport {
    async fn execute(
        &self,
        _method: Method,
        _path: &str,
        _query: &[(String, String)],
        _token: Option<&str>,
        _body: Option<Value>,
    ) -> Result<Value, RemoteError> {
        Err(RemoteError::Transient("connection refused".to_string()))
    }
}

/// Client with no stored credentials: every operation goes straight to the
/// local path.
pub fn offline_client() -> RemoteClient {
    RemoteClient::new(Arc::new(UnreachableTransport), Arc::new(AuthState::new()))
}

/// Client that is signed in but whose backend is unreachable: exercises the
/// transient-failure fallback rather than the signed-out shortcut.
pub async fn unreachable_client() -> RemoteClient {
    let auth = Arc::new(AuthState::new());
    auth.login(SessionTokens {
        access: "a".to_string(),
        refresh: "r".to_string(),
    })
    .await;
    RemoteClient::new(Arc::new(UnreachableTransport), auth)
}

/// Minimal in-memory backend honoring the gateway's REST conventions.
///
/// Collections are keyed by `<entity>|<year>`; single-object endpoints
/// (settings) by their full path plus year.
pub struct FakeServer {
    collections: DashMap<String, Vec<Value>>,
    objects: DashMap<String, Value>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
            objects: DashMap::new(),
        }
    }

    fn year_of(query: &[(String, String)]) -> String {
        query
            .iter()
            .find(|(k, _)| k == "year")
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    }

    /// Split `/api/<entity>/` or `/api/<entity>/<id>/` into (entity, id).
    fn split_path(path: &str) -> Option<(String, Option<String>)> {
        let rest = path.strip_prefix("/api/")?;
        let mut parts = rest.trim_end_matches('/').splitn(2, '/');
        let entity = parts.next()?.to_string();
        let id = parts
            .next()
            .map(|raw| urlencoding::decode(raw).map(|s| s.into_owned()).ok())
            .flatten();
        Some((entity, id))
    }

    fn item_id(item: &Value) -> String {
        item.get("id")
            .map(|v| match v {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => String::new(),
            })
            .unwrap_or_default()
    }
}

impl Default for FakeServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteTransport for FakeServer {
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<Value, RemoteError> {
        if token.is_none() && path != crate::remote::TOKEN_REFRESH_PATH {
            return Err(RemoteError::AuthExpired);
        }

        // Single-object endpoints (settings blobs)
        if path.starts_with("/api/settings/") {
            let key = format!("{}|{}", path, Self::year_of(query));
            return match method {
                Method::Get => self
                    .objects
                    .get(&key)
                    .map(|v| v.clone())
                    .ok_or_else(|| RemoteError::Validation("No such settings".to_string())),
                Method::Put => {
                    let value = body.unwrap_or(Value::Null);
                    self.objects.insert(key, value.clone());
                    Ok(value)
                }
                _ => Err(RemoteError::Validation("Unsupported".to_string())),
            };
        }

        let Some((entity, id)) = Self::split_path(path) else {
            return Err(RemoteError::Validation(format!("Bad path {}", path)));
        };
        let key = format!("{}|{}", entity, Self::year_of(query));

        match (method, id) {
            (Method::Get, None) => Ok(Value::Array(
                self.collections.get(&key).map(|v| v.clone()).unwrap_or_default(),
            )),
            (Method::Post, None) => {
                let item = body.ok_or_else(|| {
                    RemoteError::Validation("Missing request body".to_string())
                })?;
                let new_id = Self::item_id(&item);
                let mut items = self.collections.entry(key).or_default();
                if !new_id.is_empty() && items.iter().any(|i| Self::item_id(i) == new_id) {
                    return Err(RemoteError::Validation(format!(
                        "Duplicate identifier {}",
                        new_id
                    )));
                }
                items.push(item.clone());
                Ok(item)
            }
            (Method::Put, Some(id)) => {
                let item = body.ok_or_else(|| {
                    RemoteError::Validation("Missing request body".to_string())
                })?;
                let mut items = self.collections.entry(key).or_default();
                match items.iter_mut().find(|i| Self::item_id(i) == id) {
                    Some(slot) => {
                        *slot = item.clone();
                        Ok(item)
                    }
                    None => Err(RemoteError::Validation(format!("No such id {}", id))),
                }
            }
            (Method::Patch, Some(id)) => {
                let patch = body.ok_or_else(|| {
                    RemoteError::Validation("Missing request body".to_string())
                })?;
                let mut items = self.collections.entry(key).or_default();
                match items.iter_mut().find(|i| Self::item_id(i) == id) {
                    Some(slot) => {
                        crate::gateway::merge_patch(slot, &patch);
                        Ok(slot.clone())
                    }
                    None => Err(RemoteError::Validation(format!("No such id {}", id))),
                }
            }
            (Method::Delete, Some(id)) => {
                if let Some(mut items) = self.collections.get_mut(&key) {
                    items.retain(|i| Self::item_id(i) != id);
                }
                Ok(Value::Null)
            }
            _ => Err(RemoteError::Validation(format!("Unsupported {}", path))),
        }
    }
}

/// Signed-in client backed by a fresh `FakeServer`.
pub async fn online_client() -> (RemoteClient, Arc<AuthState>, Arc<FakeServer>) {
    let auth = Arc::new(AuthState::new());
    auth.login(SessionTokens {
        access: "a".to_string(),
        refresh: "r".to_string(),
    })
    .await;
    let server = Arc::new(FakeServer::new());
    let client = RemoteClient::new(
        Arc::clone(&server) as Arc<dyn RemoteTransport>,
        Arc::clone(&auth),
    );
    (client, auth, server)
}
