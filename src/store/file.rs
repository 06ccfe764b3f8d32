//! File-backed store implementation.
//!
//! One file per key under a directory, so a crash mid-write corrupts at
//! most one key (and corrupt values read as absent). Keys are sanitized to
//! file names; the byte budget is computed over all stored files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

use super::LocalStore;
use crate::types::{GatewayError, Result};

const VALUE_EXT: &str = "json";

/// Directory-backed store with an optional byte budget.
pub struct FileStore {
    dir: PathBuf,
    used_bytes: AtomicU64,
    quota_bytes: Option<u64>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>, quota_bytes: Option<u64>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| GatewayError::Storage(format!("Cannot create {}: {}", dir.display(), e)))?;

        // Account existing files against the budget
        let mut used = 0u64;
        for entry in fs::read_dir(&dir)
            .map_err(|e| GatewayError::Storage(format!("Cannot read {}: {}", dir.display(), e)))?
        {
            let entry =
                entry.map_err(|e| GatewayError::Storage(format!("Cannot read dir entry: {}", e)))?;
            if let Ok(meta) = entry.metadata() {
                if meta.is_file() {
                    used += meta.len();
                }
            }
        }

        Ok(Self {
            dir,
            used_bytes: AtomicU64::new(used),
            quota_bytes,
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys contain only [A-Za-z0-9_-/] in practice; escape the rest
        let name: String = key
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-' | '.' => c,
                _ => '~',
            })
            .collect();
        self.dir.join(format!("{}.{}", name, VALUE_EXT))
    }
}

impl LocalStore for FileStore {
    fn get_raw(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let old_size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let new_size = value.len() as u64;

        if let Some(quota) = self.quota_bytes {
            let used = self.used_bytes.load(Ordering::Relaxed);
            if used.saturating_sub(old_size) + new_size > quota {
                return Err(GatewayError::Storage(format!(
                    "Quota exceeded writing {} ({} bytes, {} of {} in use)",
                    key, new_size, used, quota
                )));
            }
        }

        // Write-then-rename so readers never observe a torn value
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value)
            .map_err(|e| GatewayError::Storage(format!("Write failed for {}: {}", key, e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| GatewayError::Storage(format!("Rename failed for {}: {}", key, e)))?;

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
        let path = self.path_for(key);
        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        match fs::remove_file(&path) {
            Ok(()) => {
                self.used_bytes.fetch_sub(size, Ordering::Relaxed);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", key, e),
        }
    }

    fn keys(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                name.strip_suffix(&format!(".{}", VALUE_EXT))
                    .map(|s| s.to_string())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path(), None).unwrap();
            store.set_raw("students_2024", r#"[{"id":"S1","name":"An"}]"#).unwrap();
        }
        let store = FileStore::open(dir.path(), None).unwrap();
        assert_eq!(
            store.get_raw("students_2024").as_deref(),
            Some(r#"[{"id":"S1","name":"An"}]"#)
        );
        assert!(store.keys().contains(&"students_2024".to_string()));
    }

    #[test]
    fn test_reopen_accounts_existing_bytes_against_quota() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path(), Some(64)).unwrap();
            store.set_raw("a", &"x".repeat(40)).unwrap();
        }
        let store = FileStore::open(dir.path(), Some(64)).unwrap();
        let err = store.set_raw("b", &"y".repeat(40)).unwrap_err();
        assert!(matches!(err, GatewayError::Storage(_)));
    }

    #[test]
    fn test_remove_missing_key_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path(), None).unwrap();
        store.remove("absent");
    }
}
