//! reqwest-backed transport.
//!
//! Every request carries the fixed client-side timeout from the gateway
//! configuration; a timeout is classified as transient, identical to a
//! network failure.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{Method, RemoteError, RemoteTransport};

/// HTTP transport over the REST backend.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport for `base_url` with a fixed request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transient(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Pull a human-readable message out of an error body.
    ///
    /// The backend uses `{"detail": "..."}`; fall back to the raw body.
    fn detail_message(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
            .unwrap_or_else(|| body.to_string())
    }
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<Value, RemoteError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method.as_str(), url);

        let mut request = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Patch => self.client.patch(&url),
            Method::Delete => self.client.delete(&url),
        };

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Transient(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::Transient(e.to_string()))?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(RemoteError::AuthExpired);
        }
        if status.is_server_error() {
            return Err(RemoteError::Transient(format!("HTTP {}", status.as_u16())));
        }
        if status.is_client_error() {
            return Err(RemoteError::Validation(Self::detail_message(&text)));
        }

        if text.is_empty() {
            // 204 No Content and friends
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| RemoteError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_message_prefers_detail_field() {
        assert_eq!(
            HttpTransport::detail_message(r#"{"detail":"Student id already exists"}"#),
            "Student id already exists"
        );
        assert_eq!(HttpTransport::detail_message("bad request"), "bad request");
    }
}
