//! The local data store: every collection plus bulk export, import and clear.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use tracing::{info, warn};

use super::{keys, Collection, FileStore, KeyValueStore, OfflineFlag, PreferencesStore, SyncMetadata};
use crate::diagnostics;
use crate::models::{
    ChatMessage, FlashCard, ImportData, KnowledgeMap, OfflineData, Quiz, WellnessRecord,
};

/// Chat history keeps only this many of the newest messages.
pub const CHAT_HISTORY_CAP: usize = 100;

/// Usage above this many megabytes triggers the quota warning.
pub const QUOTA_WARNING_MB: f64 = 4.5;

/// Counts and footprint for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageSummary {
    pub flashcards: usize,
    pub quizzes: usize,
    pub wellness_records: usize,
    pub chat_messages: usize,
    pub knowledge_maps: usize,
    pub usage_mb: f64,
    pub quota_warning: bool,
}

impl StorageSummary {
    pub fn total_items(&self) -> usize {
        self.flashcards
            + self.quizzes
            + self.wellness_records
            + self.chat_messages
            + self.knowledge_maps
    }
}

/// Handles persistence of all study data.
pub struct LocalStore {
    medium: Arc<dyn KeyValueStore>,
    pub flashcards: Collection<FlashCard>,
    pub quizzes: Collection<Quiz>,
    pub wellness: Collection<WellnessRecord>,
    pub chat: Collection<ChatMessage>,
    pub knowledge_maps: Collection<KnowledgeMap>,
    pub preferences: PreferencesStore,
    pub sync: SyncMetadata,
    pub offline: OfflineFlag,
}

impl LocalStore {
    pub fn new(medium: Arc<dyn KeyValueStore>) -> Self {
        Self {
            flashcards: Collection::new(medium.clone(), keys::FLASHCARDS),
            quizzes: Collection::new(medium.clone(), keys::QUIZZES),
            wellness: Collection::new(medium.clone(), keys::WELLNESS_RECORDS),
            chat: Collection::new(medium.clone(), keys::CHAT_HISTORY).with_cap(CHAT_HISTORY_CAP),
            knowledge_maps: Collection::new(medium.clone(), keys::KNOWLEDGE_MAPS),
            preferences: PreferencesStore::new(medium.clone()),
            sync: SyncMetadata::new(medium.clone()),
            offline: OfflineFlag::new(medium.clone()),
            medium,
        }
    }

    /// Open a file-backed store in `dir`.
    pub fn open(dir: PathBuf, quota_bytes: Option<u64>) -> Self {
        let mut file_store = FileStore::open(dir);
        if let Some(quota) = quota_bytes {
            file_store = file_store.with_quota(quota);
        }
        Self::new(Arc::new(file_store))
    }

    /// The underlying medium, shared with the auth stub.
    pub fn medium(&self) -> Arc<dyn KeyValueStore> {
        self.medium.clone()
    }

    pub fn is_available(&self) -> bool {
        self.medium.is_available()
    }

    // ══════════════════════════════════════════════════════════════════════
    // Bulk operations
    // ══════════════════════════════════════════════════════════════════════

    pub fn export_all(&self) -> OfflineData {
        OfflineData {
            flashcards: self.flashcards.get_all(),
            quizzes: self.quizzes.get_all(),
            wellness_records: self.wellness.get_all(),
            chat_history: self.chat.get_all(),
            knowledge_maps: self.knowledge_maps.get_all(),
            last_sync: self
                .sync
                .last_sync()
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
                .unwrap_or_default(),
        }
    }

    /// Overwrite each collection present in `data`. Not transactional: a
    /// failed write leaves the collections written before it in place.
    pub fn import_all(&self, data: ImportData) -> bool {
        let mut ok = true;

        if let Some(flashcards) = data.flashcards {
            ok &= self.flashcards.save(&flashcards);
        }
        if let Some(quizzes) = data.quizzes {
            ok &= self.quizzes.save(&quizzes);
        }
        if let Some(records) = data.wellness_records {
            ok &= self.wellness.save(&records);
        }
        if let Some(messages) = data.chat_history {
            ok &= self.chat.save(&messages);
        }
        if let Some(maps) = data.knowledge_maps {
            ok &= self.knowledge_maps.save(&maps);
        }
        if let Some(last_sync) = data.last_sync.filter(|s| !s.is_empty()) {
            ok &= self.sync.set_last_sync_str(&last_sync);
        }

        if !ok {
            warn!("import finished with failed collections");
        }
        ok
    }

    /// Empty every study collection. Keeps going past failures and reports
    /// `false` if any clear failed; nothing is rolled back.
    pub fn clear_all(&self) -> bool {
        let results = [
            (keys::FLASHCARDS, self.flashcards.clear()),
            (keys::QUIZZES, self.quizzes.clear()),
            (keys::WELLNESS_RECORDS, self.wellness.clear()),
            (keys::CHAT_HISTORY, self.chat.clear()),
            (keys::KNOWLEDGE_MAPS, self.knowledge_maps.clear()),
        ];

        let failed: Vec<&str> = results
            .iter()
            .filter(|(_, ok)| !ok)
            .map(|(key, _)| *key)
            .collect();

        if failed.is_empty() {
            info!("cleared all local collections");
            true
        } else {
            diagnostics::storage_degraded("clear_all", &failed.join(","), &"collections left uncleared");
            false
        }
    }

    /// Write an export snapshot as pretty JSON.
    pub fn export_to_file(&self, path: &Path) -> Result<OfflineData> {
        let data = self.export_all();
        let json = serde_json::to_string_pretty(&data).context("Failed to serialize export")?;
        fs::write(path, json).with_context(|| format!("Failed to write export file: {:?}", path))?;
        Ok(data)
    }

    /// Read an export file and import it. Returns whether every write landed.
    pub fn import_from_file(&self, path: &Path) -> Result<bool> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read import file: {:?}", path))?;
        let data: ImportData =
            serde_json::from_str(&json).with_context(|| format!("Invalid export file: {:?}", path))?;
        Ok(self.import_all(data))
    }

    /// Get default export path, dated like `edubridge-data-2026-01-31.json`.
    pub fn default_export_path() -> PathBuf {
        let date = chrono::Utc::now().format("%Y-%m-%d");
        dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(format!("edubridge-data-{}.json", date))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Storage accounting
    // ══════════════════════════════════════════════════════════════════════

    /// Byte length of every stored key and value.
    pub fn usage_bytes(&self) -> u64 {
        match self.medium.entries() {
            Ok(entries) => entries
                .iter()
                .map(|(k, v)| (k.len() + v.len()) as u64)
                .sum(),
            Err(e) => {
                diagnostics::storage_degraded("usage", "*", &e);
                0
            }
        }
    }

    /// Usage in megabytes, rounded to two decimals.
    pub fn usage_mb(&self) -> f64 {
        let mb = self.usage_bytes() as f64 / 1024.0 / 1024.0;
        (mb * 100.0).round() / 100.0
    }

    /// Soft warning only; writes are not blocked.
    pub fn is_quota_exceeded(&self) -> bool {
        self.usage_mb() > QUOTA_WARNING_MB
    }

    pub fn summary(&self) -> StorageSummary {
        let usage_mb = self.usage_mb();
        StorageSummary {
            flashcards: self.flashcards.len(),
            quizzes: self.quizzes.len(),
            wellness_records: self.wellness.len(),
            chat_messages: self.chat.len(),
            knowledge_maps: self.knowledge_maps.len(),
            usage_mb,
            quota_warning: usage_mb > QUOTA_WARNING_MB,
        }
    }
}
