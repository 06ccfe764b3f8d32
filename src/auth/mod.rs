//! Session credentials.
//!
//! Holds the bearer access/refresh token pair and the process-wide
//! session-expired signal. Tokens are opaque strings issued by the backend;
//! nothing here inspects or validates them.
//!
//! The refresh sub-protocol itself (one silent refresh, one retry, no
//! recursion) is driven by `remote::RemoteClient`; this module only owns the
//! credential state it mutates.

use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Callback invoked when the session expires (refresh failed after a 401).
/// The UI layer uses it to force a logout.
pub type SessionExpiredHook = Arc<dyn Fn() + Send + Sync>;

/// The bearer token pair for the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    pub access: String,
    pub refresh: String,
}

/// Shared credential state.
pub struct AuthState {
    tokens: RwLock<Option<SessionTokens>>,
    /// Serializes refresh attempts so concurrent 401s trigger one refresh
    refresh_lock: Mutex<()>,
    on_session_expired: RwLock<Option<SessionExpiredHook>>,
}

impl AuthState {
    /// Create signed-out credential state.
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            on_session_expired: RwLock::new(None),
        }
    }

    /// Install the session-expired callback.
    pub async fn set_session_expired_hook(&self, hook: SessionExpiredHook) {
        *self.on_session_expired.write().await = Some(hook);
    }

    /// Store a fresh token pair after login.
    pub async fn login(&self, tokens: SessionTokens) {
        *self.tokens.write().await = Some(tokens);
        info!("Session credentials stored");
    }

    /// Drop credentials without firing the expired signal (explicit logout).
    pub async fn logout(&self) {
        *self.tokens.write().await = None;
    }

    /// Whether a credential is currently held. Gateway operations skip the
    /// remote path entirely when this is false.
    pub async fn has_credentials(&self) -> bool {
        self.tokens.read().await.is_some()
    }

    /// Current access token, if signed in.
    pub async fn access_token(&self) -> Option<String> {
        self.tokens.read().await.as_ref().map(|t| t.access.clone())
    }

    /// Current refresh token, if signed in.
    pub async fn refresh_token(&self) -> Option<String> {
        self.tokens.read().await.as_ref().map(|t| t.refresh.clone())
    }

    /// Replace the access token after a successful silent refresh.
    pub async fn replace_access(&self, access: String) {
        if let Some(tokens) = self.tokens.write().await.as_mut() {
            tokens.access = access;
        }
    }

    /// Acquire the single-flight refresh guard.
    pub async fn refresh_guard(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.refresh_lock.lock().await
    }

    /// Clear credentials and fire the session-expired callback.
    ///
    /// Subsequent gateway calls see no credentials and go straight to the
    /// local path until a new login.
    pub async fn expire_session(&self) {
        *self.tokens.write().await = None;
        warn!("Session expired, credentials cleared");
        if let Some(hook) = self.on_session_expired.read().await.as_ref() {
            hook();
        }
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_expire_fires_hook_and_clears() {
        let auth = AuthState::new();
        auth.login(SessionTokens {
            access: "a1".to_string(),
            refresh: "r1".to_string(),
        })
        .await;

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        auth.set_session_expired_hook(Arc::new(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        }))
        .await;

        auth.expire_session().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!auth.has_credentials().await);
    }

    #[tokio::test]
    async fn test_logout_does_not_fire_hook() {
        let auth = AuthState::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        auth.set_session_expired_hook(Arc::new(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        }))
        .await;

        auth.login(SessionTokens {
            access: "a1".to_string(),
            refresh: "r1".to_string(),
        })
        .await;
        auth.logout().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
