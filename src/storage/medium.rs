//! Key-value media: a directory of JSON files, and an in-process map.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use super::{KeyValueStore, StorageError, StorageResult};

fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

fn entry_size(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}

fn check_quota(
    quota: Option<u64>,
    entries: &[(String, String)],
    key: &str,
    value: &str,
) -> StorageResult<()> {
    let Some(quota) = quota else {
        return Ok(());
    };

    let current = entries
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.len());
    // Writes that do not grow their entry always pass.
    if current.map_or(false, |len| value.len() <= len) {
        return Ok(());
    }

    let others: u64 = entries
        .iter()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| entry_size(k, v))
        .sum();
    let used = others + entry_size(key, value);

    if used > quota {
        Err(StorageError::QuotaExceeded { used, quota })
    } else {
        Ok(())
    }
}

// ══════════════════════════════════════════════════════════════════════════
// File Store
// ══════════════════════════════════════════════════════════════════════════

/// One `<key>.json` file per key inside a data directory.
pub struct FileStore {
    dir: PathBuf,
    available: bool,
    quota_bytes: Option<u64>,
}

impl FileStore {
    /// Open a store rooted at `dir`. Never fails: if the directory cannot be
    /// created or written, the store reports itself unavailable.
    pub fn open(dir: PathBuf) -> Self {
        let available = Self::probe(&dir);
        if !available {
            debug!(dir = ?dir, "data directory is not writable, storage unavailable");
        }

        Self {
            dir,
            available,
            quota_bytes: None,
        }
    }

    /// Reject writes that would push the total footprint past `bytes`.
    pub fn with_quota(mut self, bytes: u64) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }

    /// Get default storage location.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("edubridge")
            .join("store")
    }

    fn probe(dir: &PathBuf) -> bool {
        if fs::create_dir_all(dir).is_err() {
            return false;
        }
        let probe = dir.join(".probe");
        let writable = fs::write(&probe, b"probe").is_ok();
        let _ = fs::remove_file(&probe);
        writable
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn ensure_available(&self) -> StorageResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StorageError::Unavailable)
        }
    }
}

impl KeyValueStore for FileStore {
    fn is_available(&self) -> bool {
        self.available && self.dir.is_dir()
    }

    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        self.ensure_available()?;
        validate_key(key)?;

        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.ensure_available()?;
        validate_key(key)?;

        if self.quota_bytes.is_some() {
            check_quota(self.quota_bytes, &self.entries()?, key, value)?;
        }

        // Write beside the target and rename so readers never see half a value.
        let path = self.key_path(key);
        let tmp = self.dir.join(format!(".{}.tmp", key));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.ensure_available()?;
        validate_key(key)?;

        let path = self.key_path(key);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    fn entries(&self) -> StorageResult<Vec<(String, String)>> {
        self.ensure_available()?;

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().map_or(false, |e| e == "json") {
                let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let value = fs::read_to_string(&path)?;
                entries.push((key.to_string(), value));
            }
        }
        entries.sort();
        Ok(entries)
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Memory Store
// ══════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct MemoryState {
    items: BTreeMap<String, String>,
    unavailable: bool,
    failing_keys: HashSet<String>,
    writes_before_outage: Option<usize>,
    quota_bytes: Option<u64>,
}

/// In-process store with switches for simulating a hostile medium.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(self, bytes: u64) -> Self {
        self.lock().quota_bytes = Some(bytes);
        self
    }

    /// Make every operation fail as if storage were disabled.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Make writes to `key` fail with an I/O error.
    pub fn fail_writes_for(&self, key: &str) {
        self.lock().failing_keys.insert(key.to_string());
    }

    /// Allow `count` more writes, then become unavailable.
    pub fn fail_after_writes(&self, count: usize) {
        self.lock().writes_before_outage = Some(count);
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin_write(state: &mut MemoryState, key: &str) -> StorageResult<()> {
        if state.unavailable {
            return Err(StorageError::Unavailable);
        }
        if let Some(remaining) = state.writes_before_outage.as_mut() {
            if *remaining == 0 {
                state.unavailable = true;
                return Err(StorageError::Unavailable);
            }
            *remaining -= 1;
        }
        if state.failing_keys.contains(key) {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("write to {} rejected", key),
            )));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn is_available(&self) -> bool {
        !self.lock().unavailable
    }

    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let state = self.lock();
        if state.unavailable {
            return Err(StorageError::Unavailable);
        }
        Ok(state.items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut state = self.lock();
        Self::begin_write(&mut state, key)?;

        let entries: Vec<(String, String)> = state
            .items
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        check_quota(state.quota_bytes, &entries, key, value)?;

        state.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let mut state = self.lock();
        Self::begin_write(&mut state, key)?;
        state.items.remove(key);
        Ok(())
    }

    fn entries(&self) -> StorageResult<Vec<(String, String)>> {
        let state = self.lock();
        if state.unavailable {
            return Err(StorageError::Unavailable);
        }
        Ok(state
            .items
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_store_persists_across_reopen() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path().to_path_buf());
        assert!(store.is_available());
        store.set_item("edubridge_chat", "[]").unwrap();

        let reopened = FileStore::open(tmp.path().to_path_buf());
        assert_eq!(
            reopened.get_item("edubridge_chat").unwrap().as_deref(),
            Some("[]")
        );
        assert_eq!(
            reopened.entries().unwrap(),
            vec![("edubridge_chat".to_string(), "[]".to_string())]
        );
    }

    #[test]
    fn file_store_missing_key_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path().to_path_buf());
        assert_eq!(store.get_item("auth_token").unwrap(), None);
        store.remove_item("auth_token").unwrap();
    }

    #[test]
    fn file_store_under_a_file_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        fs::write(&blocker, "x").unwrap();

        let store = FileStore::open(blocker.join("store"));
        assert!(!store.is_available());
        assert!(matches!(
            store.set_item("edubridge_chat", "[]"),
            Err(StorageError::Unavailable)
        ));
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path().to_path_buf());
        assert!(matches!(
            store.set_item("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn file_store_enforces_quota() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path().to_path_buf()).with_quota(64);
        store.set_item("small", "0123456789").unwrap();

        let big = "x".repeat(100);
        assert!(matches!(
            store.set_item("big", &big),
            Err(StorageError::QuotaExceeded { quota: 64, .. })
        ));
        // Overwriting an existing key only counts the new value.
        store.set_item("small", "abc").unwrap();
    }

    #[test]
    fn over_quota_store_still_shrinks() {
        let tmp = TempDir::new().unwrap();
        let filled = FileStore::open(tmp.path().to_path_buf());
        filled.set_item("notes", &"n".repeat(200)).unwrap();

        let store = FileStore::open(tmp.path().to_path_buf()).with_quota(50);
        store.set_item("notes", "[]").unwrap();
        store.remove_item("notes").unwrap();
        assert_eq!(store.get_item("notes").unwrap(), None);

        let memory = MemoryStore::new();
        memory.set_item("notes", &"n".repeat(200)).unwrap();
        let memory = memory.with_quota(50);
        memory.set_item("notes", "[]").unwrap();
        assert!(matches!(
            memory.set_item("other", &"o".repeat(60)),
            Err(StorageError::QuotaExceeded { quota: 50, .. })
        ));
    }

    #[test]
    fn memory_store_outage_after_writes() {
        let store = MemoryStore::new();
        store.fail_after_writes(1);
        store.set_item("a", "1").unwrap();
        assert!(store.set_item("b", "2").is_err());
        assert!(!store.is_available());
        assert!(store.get_item("a").is_err());
    }
}
