//! Local persistent store.
//!
//! Flat string-keyed storage, the offline half of the hybrid gateway. The
//! gateway is the sole writer. Key scheme:
//!
//! - `<entity>_<year>` for collections (e.g. `students_2024`)
//! - `settings_<kind>_<year>` for configuration blobs
//! - `file_<fileId>` for data-URL blobs attached to log entries and
//!   milestone submissions
//! - `years` for the list of known academic years
//!
//! No schema is enforced beyond what the gateway writes. Writes may fail
//! with a quota error, which is the one local failure surfaced to the user.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::model::SettingsKind;
use crate::types::{GatewayError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Key under which the known-years list is stored.
pub const YEARS_KEY: &str = "years";

/// Storage key for an entity collection scoped to one academic year.
pub fn collection_key(entity: &str, year: &str) -> String {
    format!("{}_{}", entity, year)
}

/// Storage key for a settings blob scoped to one academic year.
pub fn settings_key(kind: SettingsKind, year: &str) -> String {
    format!("settings_{}_{}", kind, year)
}

/// Storage key for a data-URL blob.
pub fn file_key(file_id: &str) -> String {
    format!("file_{}", file_id)
}

/// Flat string-keyed persistent store.
///
/// Implementations are expected to be cheap to clone behind an `Arc` and
/// safe to call from async tasks (no internal awaits).
pub trait LocalStore: Send + Sync {
    /// Read the raw value for a key, if present.
    fn get_raw(&self, key: &str) -> Option<String>;

    /// Write a value. Fails with `GatewayError::Storage` when the byte
    /// budget would be exceeded; a failed write applies nothing.
    fn set_raw(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&self, key: &str);

    /// All keys currently present.
    fn keys(&self) -> Vec<String>;
}

/// Typed read on top of `get_raw`.
///
/// A present-but-corrupt value is treated as absent: the caller falls back
/// to its built-in default rather than failing a load over a bad snapshot.
pub fn read_json<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Option<T> {
    let raw = store.get_raw(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Discarding corrupt local snapshot {}: {}", key, e);
            None
        }
    }
}

/// Typed write on top of `set_raw`.
pub fn write_json<T: Serialize>(store: &dyn LocalStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)
        .map_err(|e| GatewayError::Serialization(e.to_string()))?;
    store.set_raw(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_scheme() {
        assert_eq!(collection_key("students", "2024"), "students_2024");
        assert_eq!(
            settings_key(SettingsKind::Defense, "2024"),
            "settings_defense_2024"
        );
        assert_eq!(file_key("abc123"), "file_abc123");
    }

    #[test]
    fn test_corrupt_snapshot_reads_as_absent() {
        let store = MemoryStore::unbounded();
        store.set_raw("students_2024", "{not json").unwrap();
        let read: Option<Vec<crate::model::Student>> = read_json(&store, "students_2024");
        assert!(read.is_none());
    }
}
