//! EduBridge offline core.
//!
//! Typed study collections kept in a local key-value medium, and a backend
//! shim that keeps every flow working with no backend at all.

pub mod actions;
pub mod api;
pub mod config;
pub mod diagnostics;
pub mod models;
pub mod storage;

pub use actions::{ActionError, NotesImport, StudyActions};
pub use api::{ApiConfig, ApiGateway, AuthStub};
pub use config::Config;
pub use storage::{KeyValueStore, LocalStore};
