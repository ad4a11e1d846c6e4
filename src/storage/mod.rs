//! Local persistence for the study collections.
//!
//! Every collection lives as one JSON value under one fixed key of a
//! [`KeyValueStore`]. Reads and writes never fail outward: an unavailable
//! medium, a full quota or a corrupted value turn into "empty" or `false`,
//! and the cause goes to [`crate::diagnostics`].

mod collection;
mod local;
mod medium;
mod singleton;

pub use collection::Collection;
pub use local::{LocalStore, StorageSummary, QUOTA_WARNING_MB};
pub use medium::{FileStore, MemoryStore};
pub use singleton::{OfflineFlag, PreferencesStore, SyncMetadata};

use thiserror::Error;

/// Fixed storage keys, one per collection or singleton.
pub mod keys {
    pub const FLASHCARDS: &str = "edubridge_flashcards";
    pub const QUIZZES: &str = "edubridge_quizzes";
    pub const WELLNESS_RECORDS: &str = "edubridge_wellness";
    pub const CHAT_HISTORY: &str = "edubridge_chat";
    pub const KNOWLEDGE_MAPS: &str = "edubridge_knowledge_maps";
    pub const LAST_SYNC: &str = "edubridge_last_sync";
    pub const USER_PREFERENCES: &str = "edubridge_preferences";
    pub const OFFLINE_MODE: &str = "edubridge_offline_mode";

    pub const AUTH_TOKEN: &str = "auth_token";
    pub const USER_ROLE: &str = "user_role";
    pub const USER_EMAIL: &str = "user_email";
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage medium is unavailable")]
    Unavailable,

    #[error("storage quota exceeded: {used} of {quota} bytes")]
    QuotaExceeded { used: u64, quota: u64 },

    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// A string-to-string persistent map, the equivalent of per-origin browser
/// storage.
pub trait KeyValueStore: Send + Sync {
    /// Whether the medium can be used at all.
    fn is_available(&self) -> bool;

    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the value under `key` in a single write.
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// Every stored `(key, value)` pair.
    fn entries(&self) -> StorageResult<Vec<(String, String)>>;
}
