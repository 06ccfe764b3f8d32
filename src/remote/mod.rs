//! Remote REST backend access.
//!
//! - `RemoteTransport`: the request seam (HTTP in production, fakes in tests)
//! - `HttpTransport`: reqwest implementation with a fixed client-side timeout
//! - `RemoteClient`: bearer-token attachment and the silent-refresh protocol
//! - `dto`: wire shapes and their translation to canonical models
//!
//! The error taxonomy here is internal to the gateway: `Transient` failures
//! are consumed by the local-store fallback and never surface to callers.

pub mod client;
pub mod dto;
pub mod http;

pub use client::RemoteClient;
pub use http::HttpTransport;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Remote failure classification.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Network error, timeout, or 5xx. Recovered via the local path.
    #[error("Transient remote failure: {0}")]
    Transient(String),

    /// 401: access token rejected. Triggers the refresh sub-protocol.
    #[error("Authentication expired")]
    AuthExpired,

    /// 4xx with a server-supplied detail (duplicate id, malformed payload).
    /// Propagated to the caller; retrying locally would hide a real problem.
    #[error("{0}")]
    Validation(String),

    /// Response body could not be decoded. Treated like a transient failure
    /// by the gateway (the local snapshot is more trustworthy).
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// HTTP method subset the backend uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

/// Request seam over the REST backend.
///
/// `token` is the bearer access token; `None` for unauthenticated calls
/// (the token-refresh endpoint itself).
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<Value, RemoteError>;
}

/// Collection endpoint for an entity (`/api/students/`).
pub fn collection_path(entity: &str) -> String {
    format!("/api/{}/", entity)
}

/// Single-resource endpoint (`/api/students/{id}/`).
///
/// Domain ids may contain `/` (e.g. "155N0001/21"), so the id segment is
/// percent-encoded.
pub fn resource_path(entity: &str, id: &str) -> String {
    format!("/api/{}/{}/", entity, urlencoding::encode(id))
}

/// Settings endpoint keyed by the settings-type enumeration.
pub fn settings_path(kind: crate::model::SettingsKind) -> String {
    format!("/api/settings/{}/", kind)
}

/// Token refresh endpoint.
pub const TOKEN_REFRESH_PATH: &str = "/api/token/refresh/";

/// Academic-year collection endpoint.
pub const YEARS_PATH: &str = "/api/years/";
