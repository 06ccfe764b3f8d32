//! Satchel - hybrid offline-first data gateway
//!
//! Client-side data layer for the final-year-project management backend.
//! Every collection operation prefers the remote REST API and falls back to
//! a year-partitioned local key-value snapshot, so the client keeps working
//! when the backend is unreachable or the user is signed out.
//!
//! ## Components
//!
//! - **Gateway**: per-entity repositories with remote-then-local duality
//! - **Store**: flat string-keyed persistent snapshots (`<entity>_<year>`)
//! - **Remote**: reqwest client with the one-shot silent token refresh
//! - **Auth**: bearer token pair and the session-expired signal
//! - **Notify**: live notification feed over a reconnecting WebSocket

pub mod auth;
pub mod config;
pub mod gateway;
pub mod model;
pub mod notify;
pub mod remote;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::GatewayConfig;
pub use gateway::{Collection, HybridGateway, Repository};
pub use notify::NotificationFeed;
pub use types::{GatewayError, Result};

use std::sync::Arc;

use auth::AuthState;
use remote::{HttpTransport, RemoteClient};
use store::LocalStore;

/// Assemble a gateway over HTTP with the given local store.
///
/// The common production wiring; tests and embedded uses construct
/// `HybridGateway` directly with their own transport.
pub fn build_gateway(
    config: GatewayConfig,
    store: Arc<dyn LocalStore>,
    initial_year: &str,
) -> Result<HybridGateway> {
    config.validate().map_err(GatewayError::Validation)?;

    let transport = HttpTransport::new(&config.base_url, config.request_timeout)
        .map_err(|e| GatewayError::Channel(e.to_string()))?;
    let auth = Arc::new(AuthState::new());
    let client = RemoteClient::new(Arc::new(transport), auth);
    Ok(HybridGateway::new(config, client, store, initial_year))
}
