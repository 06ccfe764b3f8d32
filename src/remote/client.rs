//! Authenticated remote client with the silent-refresh protocol.
//!
//! On a 401 the client attempts exactly one refresh with the stored refresh
//! token and retries the original request once. A refresh failure clears all
//! credentials and fires the session-expired signal; it never triggers
//! another refresh (no recursion). Concurrent 401s are collapsed into a
//! single refresh via the auth state's refresh guard.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{Method, RemoteError, RemoteTransport, TOKEN_REFRESH_PATH};
use crate::auth::AuthState;

/// Remote client shared by all repositories.
#[derive(Clone)]
pub struct RemoteClient {
    transport: Arc<dyn RemoteTransport>,
    auth: Arc<AuthState>,
}

impl RemoteClient {
    pub fn new(transport: Arc<dyn RemoteTransport>, auth: Arc<AuthState>) -> Self {
        Self { transport, auth }
    }

    pub fn auth(&self) -> &Arc<AuthState> {
        &self.auth
    }

    /// Execute an authenticated request, refreshing the access token once
    /// if the backend reports it expired.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<Value>,
    ) -> Result<Value, RemoteError> {
        let Some(token) = self.auth.access_token().await else {
            // Signed out (or a failed refresh already cleared credentials):
            // the gateway goes straight to the local path.
            return Err(RemoteError::Transient("No credentials held".to_string()));
        };

        match self
            .transport
            .execute(method, path, query, Some(&token), body.clone())
            .await
        {
            Err(RemoteError::AuthExpired) => {
                self.refresh_once(&token).await?;
                let retry_token = self
                    .auth
                    .access_token()
                    .await
                    .ok_or(RemoteError::AuthExpired)?;
                debug!("Retrying {} {} after token refresh", method.as_str(), path);
                match self
                    .transport
                    .execute(method, path, query, Some(&retry_token), body)
                    .await
                {
                    // The refreshed token was rejected too; do not refresh again
                    Err(RemoteError::AuthExpired) => {
                        self.auth.expire_session().await;
                        Err(RemoteError::AuthExpired)
                    }
                    other => other,
                }
            }
            other => other,
        }
    }

    /// Perform at most one silent refresh for the token that just failed.
    ///
    /// If another caller already refreshed while we waited on the guard, the
    /// stored access token differs from `stale` and nothing is done.
    async fn refresh_once(&self, stale: &str) -> Result<(), RemoteError> {
        let _guard = self.auth.refresh_guard().await;

        match self.auth.access_token().await {
            Some(current) if current != stale => return Ok(()),
            Some(_) => {}
            None => return Err(RemoteError::AuthExpired),
        }

        let Some(refresh) = self.auth.refresh_token().await else {
            self.auth.expire_session().await;
            return Err(RemoteError::AuthExpired);
        };

        let result = self
            .transport
            .execute(
                Method::Post,
                TOKEN_REFRESH_PATH,
                &[],
                None,
                Some(json!({ "refresh": refresh })),
            )
            .await;

        match result {
            Ok(value) => match value.get("access").and_then(|a| a.as_str()) {
                Some(access) => {
                    self.auth.replace_access(access.to_string()).await;
                    debug!("Access token refreshed");
                    Ok(())
                }
                None => {
                    warn!("Refresh response missing access token");
                    self.auth.expire_session().await;
                    Err(RemoteError::AuthExpired)
                }
            },
            Err(e) => {
                warn!("Token refresh failed: {}", e);
                self.auth.expire_session().await;
                Err(RemoteError::AuthExpired)
            }
        }
    }
}
