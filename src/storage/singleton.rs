//! Single-value records: preferences, sync metadata and the offline flag.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::collection::{read_json, write_json};
use super::{keys, KeyValueStore};
use crate::diagnostics;
use crate::models::{PreferencesUpdate, UserPreferences};

/// User preferences. Storage is the only copy; nothing is cached in memory.
pub struct PreferencesStore {
    medium: Arc<dyn KeyValueStore>,
}

impl PreferencesStore {
    pub fn new(medium: Arc<dyn KeyValueStore>) -> Self {
        Self { medium }
    }

    /// The stored preferences, with defaults for anything missing.
    pub fn get(&self) -> UserPreferences {
        read_json(self.medium.as_ref(), keys::USER_PREFERENCES).unwrap_or_default()
    }

    /// Merge `update` onto the stored record and write it back.
    pub fn set(&self, update: PreferencesUpdate) -> bool {
        let mut prefs = self.get();
        update.apply_to(&mut prefs);
        self.replace(&prefs)
    }

    pub fn replace(&self, prefs: &UserPreferences) -> bool {
        write_json(self.medium.as_ref(), keys::USER_PREFERENCES, prefs)
    }
}

/// When the store last completed a sync.
pub struct SyncMetadata {
    medium: Arc<dyn KeyValueStore>,
}

impl SyncMetadata {
    pub fn new(medium: Arc<dyn KeyValueStore>) -> Self {
        Self { medium }
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        read_json(self.medium.as_ref(), keys::LAST_SYNC)
    }

    /// Record a completed sync, at `timestamp` or now.
    pub fn set_last_sync(&self, timestamp: Option<DateTime<Utc>>) -> bool {
        let time = timestamp.unwrap_or_else(Utc::now);
        write_json(self.medium.as_ref(), keys::LAST_SYNC, &time)
    }

    /// Record a sync time given as an RFC 3339 string, as found in exports.
    pub fn set_last_sync_str(&self, timestamp: &str) -> bool {
        match DateTime::parse_from_rfc3339(timestamp) {
            Ok(time) => self.set_last_sync(Some(time.with_timezone(&Utc))),
            Err(e) => {
                diagnostics::storage_degraded("parse", keys::LAST_SYNC, &e);
                false
            }
        }
    }
}

/// Whether the user switched the app into offline mode.
pub struct OfflineFlag {
    medium: Arc<dyn KeyValueStore>,
}

impl OfflineFlag {
    pub fn new(medium: Arc<dyn KeyValueStore>) -> Self {
        Self { medium }
    }

    pub fn is_offline_mode(&self) -> bool {
        read_json(self.medium.as_ref(), keys::OFFLINE_MODE).unwrap_or(false)
    }

    pub fn set_offline_mode(&self, offline: bool) -> bool {
        write_json(self.medium.as_ref(), keys::OFFLINE_MODE, &offline)
    }
}
