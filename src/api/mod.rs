//! Backend access that never fails outward.
//!
//! [`ApiGateway`] tries the configured backend and answers from the mock
//! catalog whenever that is impossible or mock mode is forced, so callers
//! never branch on network availability.

mod auth;
mod gateway;
pub mod mock;
pub mod notes;
mod types;

pub use auth::{AuthStub, CurrentUser, LoginResponse, LoginUser, Role};
pub use gateway::{ApiGateway, NoteUpload, RequestOptions};
pub use mock::Fallback;
pub use notes::{NotesResponse, ProcessedNotes};
pub use types::*;

use std::time::Duration;

use thiserror::Error;

/// Backend paths.
pub mod endpoints {
    pub const HEALTH: &str = "/health";
    pub const AI_TUTOR: &str = "/api/ai-tutor";
    pub const OCR: &str = "/api/ocr";
    pub const WELLNESS: &str = "/api/wellness";
    pub const QUIZ: &str = "/api/quiz";
    pub const QUIZ_SUBMIT: &str = "/api/quiz/submit";
    pub const TEACHER_FLASHCARDS: &str = "/api/teacher/flashcards";
    pub const TEACHER_ENGAGEMENT: &str = "/api/teacher/engagement";
}

/// Knobs that select gateway behaviour.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Skip the network entirely and always serve mock data.
    pub use_mock_data: bool,
    /// Probe `/health` before each real call.
    pub enable_backend_check: bool,
    pub request_timeout: Duration,
    pub health_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            use_mock_data: true,
            enable_backend_check: false,
            request_timeout: Duration::from_secs(5),
            health_timeout: Duration::from_secs(2),
        }
    }
}

/// Why a backend call did not produce a usable response.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("mock data mode is enabled")]
    MockMode,

    #[error("backend health check failed")]
    BackendUnavailable,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("backend returned HTTP {0}")]
    Status(u16),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Fallbacks chosen by configuration rather than caused by a failure.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::MockMode)
    }
}
