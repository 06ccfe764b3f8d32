//! Crate-wide error type and result alias.
//!
//! Only failures the caller can act on are representable here. Transient
//! remote failures (network, timeout, 5xx) never reach the gateway surface;
//! they are consumed internally by the local-store fallback.

use thiserror::Error;

/// Errors surfaced by gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The remote service rejected the payload (duplicate id, malformed
    /// fields). Carries the server's human-readable detail message.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Access token expired and the silent refresh failed. Credentials have
    /// been cleared and the session-expired callback has fired.
    #[error("Session expired")]
    SessionExpired,

    /// Local store write failure, typically the byte quota.
    #[error("Local store error: {0}")]
    Storage(String),

    /// A snapshot or wire payload could not be encoded/decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Realtime channel failure (subscribe called twice, channel closed).
    #[error("Channel error: {0}")]
    Channel(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Serialization(e.to_string())
    }
}
