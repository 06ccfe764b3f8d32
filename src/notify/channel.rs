//! Realtime WebSocket channel for the notification feed.
//!
//! Best-effort: the channel authenticates with the bearer token as a
//! connection query parameter and forwards feed events into the
//! `NotificationFeed`. Loss of the connection triggers bounded reconnection
//! with a fixed delay; exhausting the attempts leaves the user on last-known
//! state until the next full reload.

use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::{FeedEvent, NotificationFeed};
use crate::types::{GatewayError, Result};

/// Fixed-delay, bounded-attempt reconnection policy.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts,
            attempts: 0,
        }
    }

    /// Delay before the next attempt, or `None` when the budget is spent.
    pub fn next_attempt(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.delay)
    }

    /// A successful connection resets the budget.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

/// Handle to a running channel task.
#[derive(Debug)]
pub struct ChannelHandle {
    shutdown: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl ChannelHandle {
    /// Stop the channel task (next year switch / logout).
    pub fn close(&self) {
        let _ = self.shutdown.send(true);
        self.task.abort();
    }
}

/// Spawn the channel task for `feed`.
///
/// `ws_url` is the notification endpoint; the bearer token is appended as a
/// `token` query parameter the way the backend expects it.
pub fn subscribe(
    feed: Arc<NotificationFeed>,
    ws_url: &str,
    token: &str,
    mut policy: ReconnectPolicy,
) -> Result<ChannelHandle> {
    if ws_url.is_empty() {
        return Err(GatewayError::Channel("Empty WebSocket URL".to_string()));
    }

    let url = format!(
        "{}{}token={}",
        ws_url,
        if ws_url.contains('?') { "&" } else { "?" },
        urlencoding::encode(token)
    );
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        loop {
            match connect_async(url.as_str()).await {
                Ok((ws, _response)) => {
                    info!("Notification channel connected");
                    policy.reset();

                    let (_write, mut read) = ws.split();
                    loop {
                        tokio::select! {
                            _ = shutdown_rx.changed() => {
                                debug!("Notification channel shutting down");
                                return;
                            }
                            message = read.next() => match message {
                                Some(Ok(Message::Text(text))) => {
                                    match serde_json::from_str::<FeedEvent>(&text) {
                                        Ok(event) => feed.apply_event(event).await,
                                        Err(e) => {
                                            warn!("Undecodable feed event (ignored): {}", e)
                                        }
                                    }
                                }
                                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                                Some(Ok(Message::Close(_))) | None => {
                                    warn!("Notification channel closed by server");
                                    break;
                                }
                                Some(Ok(_)) => {}
                                Some(Err(e)) => {
                                    warn!("Notification channel error: {}", e);
                                    break;
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("Notification channel connect failed: {}", e);
                }
            }

            match policy.next_attempt() {
                Some(delay) => {
                    debug!("Reconnecting notification channel in {:?}", delay);
                    tokio::time::sleep(delay).await;
                }
                None => {
                    // Last-known state until the next full reload
                    warn!("Notification channel reconnect budget spent, giving up");
                    return;
                }
            }

            if *shutdown_rx.borrow() {
                return;
            }
        }
    });

    Ok(ChannelHandle { shutdown, task })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_is_bounded_with_fixed_delay() {
        let mut policy = ReconnectPolicy::new(Duration::from_secs(5), 3);
        assert_eq!(policy.next_attempt(), Some(Duration::from_secs(5)));
        assert_eq!(policy.next_attempt(), Some(Duration::from_secs(5)));
        assert_eq!(policy.next_attempt(), Some(Duration::from_secs(5)));
        assert_eq!(policy.next_attempt(), None);
        // Still spent on later asks
        assert_eq!(policy.next_attempt(), None);
    }

    #[test]
    fn test_policy_resets_on_successful_connection() {
        let mut policy = ReconnectPolicy::new(Duration::from_millis(100), 1);
        assert!(policy.next_attempt().is_some());
        assert!(policy.next_attempt().is_none());
        policy.reset();
        assert!(policy.next_attempt().is_some());
    }

    #[tokio::test]
    async fn test_subscribe_rejects_empty_url() {
        let feed = Arc::new(crate::notify::NotificationFeed::new(
            "U1",
            crate::testing::offline_client(),
            Arc::new(crate::store::MemoryStore::unbounded()),
        ));
        let err = subscribe(
            feed,
            "",
            "token",
            ReconnectPolicy::new(Duration::from_secs(1), 1),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Channel(_)));
    }
}
