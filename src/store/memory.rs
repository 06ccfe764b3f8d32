//! In-memory store implementation.
//!
//! Backs tests and ephemeral (non-persistent) sessions. Enforces the same
//! byte budget as the file-backed store so quota behavior is testable.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::LocalStore;
use crate::types::{GatewayError, Result};

/// DashMap-backed store with an optional byte budget.
pub struct MemoryStore {
    entries: DashMap<String, String>,
    used_bytes: AtomicU64,
    quota_bytes: Option<u64>,
}

impl MemoryStore {
    /// Create a store with a byte budget (value lengths counted, like the
    /// file-backed store).
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            entries: DashMap::new(),
            used_bytes: AtomicU64::new(0),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Create a store with no byte budget.
    pub fn unbounded() -> Self {
        Self {
            entries: DashMap::new(),
            used_bytes: AtomicU64::new(0),
            quota_bytes: None,
        }
    }

    /// Bytes currently accounted against the budget.
    pub fn used_bytes(&self) -> u64 {
        self.used_bytes.load(Ordering::Relaxed)
    }
}

impl LocalStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        let new_size = value.len() as u64;
        let old_size = self
            .entries
            .get(key)
            .map(|entry| entry.value().len() as u64)
            .unwrap_or(0);

        if let Some(quota) = self.quota_bytes {
            let used = self.used_bytes.load(Ordering::Relaxed);
            if used.saturating_sub(old_size) + new_size > quota {
                return Err(GatewayError::Storage(format!(
                    "Quota exceeded writing {} ({} bytes, {} of {} in use)",
                    key, new_size, used, quota
                )));
            }
        }

        self.entries.insert(key.to_string(), value.to_string());
        if new_size >= old_size {
            self.used_bytes
                .fetch_add(new_size - old_size, Ordering::Relaxed);
        } else {
            self.used_bytes
                .fetch_sub(old_size - new_size, Ordering::Relaxed);
        }
        Ok(())
    }

    fn remove(&self, key: &str) {
        if let Some((_, v)) = self.entries.remove(key) {
            self.used_bytes.fetch_sub(v.len() as u64, Ordering::Relaxed);
        }
    }

    fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_remove() {
        let store = MemoryStore::unbounded();
        store.set_raw("students_2024", "[]").unwrap();
        assert_eq!(store.get_raw("students_2024").as_deref(), Some("[]"));

        store.remove("students_2024");
        assert!(store.get_raw("students_2024").is_none());
        assert_eq!(store.used_bytes(), 0);
    }

    #[test]
    fn test_budget_counts_value_bytes_like_the_file_store() {
        let store = MemoryStore::unbounded();
        store.set_raw("a_rather_long_key_name", "12345").unwrap();
        assert_eq!(store.used_bytes(), 5);
    }

    #[test]
    fn test_quota_rejects_and_applies_nothing() {
        let store = MemoryStore::with_quota(32);
        store.set_raw("a", "0123456789").unwrap();

        let err = store.set_raw("b", &"x".repeat(64)).unwrap_err();
        assert!(matches!(err, GatewayError::Storage(_)));
        // Rejected write left the store untouched
        assert!(store.get_raw("b").is_none());
        assert_eq!(store.get_raw("a").as_deref(), Some("0123456789"));
    }

    #[test]
    fn test_overwrite_reclaims_budget() {
        let store = MemoryStore::with_quota(64);
        store.set_raw("k", &"x".repeat(50)).unwrap();
        // Shrinking the value frees budget for the next write
        store.set_raw("k", "short").unwrap();
        store.set_raw("j", &"y".repeat(40)).unwrap();
    }
}
