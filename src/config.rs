//! Configuration for the gateway.
//!
//! A plain struct the host application fills in; there is no CLI surface.
//! Defaults mirror the hosted backend's development deployment.

use std::time::Duration;

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the REST backend (e.g. "https://api.fyp.example.edu")
    pub base_url: String,

    /// WebSocket URL for the realtime notification channel
    /// (e.g. "wss://api.fyp.example.edu/ws/notifications/")
    pub ws_url: String,

    /// Client-side timeout for every remote call. A timeout is treated
    /// identically to a network failure (falls back to the local path).
    pub request_timeout: Duration,

    /// Fixed delay between realtime reconnection attempts
    pub reconnect_delay: Duration,

    /// Maximum realtime reconnection attempts before giving up until the
    /// next full reload
    pub max_reconnect_attempts: u32,

    /// Byte budget for the local store when quota enforcement is enabled
    pub local_quota_bytes: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            ws_url: "ws://localhost:8000/ws/notifications/".to_string(),
            request_timeout: Duration::from_secs(15),
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_attempts: 5,
            local_quota_bytes: 8 * 1024 * 1024,
        }
    }
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("base_url must not be empty".to_string());
        }
        if self.request_timeout.is_zero() {
            return Err("request_timeout must be non-zero".to_string());
        }
        if self.local_quota_bytes == 0 {
            return Err("local_quota_bytes must be non-zero".to_string());
        }
        Ok(())
    }
}
