//! The request wrapper: real call when possible, catalog data otherwise.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::{json, Value};
use tracing::debug;

use super::mock::{self, Fallback};
use super::notes::{self, ProcessedNotes};
use super::types::{EngagementReport, QuizCatalog, TeacherCard, TutorAnswer, UploadAck, WellnessAssessment};
use super::{endpoints, ApiConfig, ApiError, AuthStub};
use crate::diagnostics;
use crate::models::QuizResult;

/// Method and JSON body of an outbound call.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            body: None,
        }
    }

    pub fn post(body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
        }
    }
}

/// A file bound for the OCR endpoint.
#[derive(Debug, Clone)]
pub struct NoteUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl NoteUpload {
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("Failed to read upload: {:?}", path))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("notes")
            .to_string();
        let mime = mime_for(path).to_string();

        Ok(Self {
            file_name,
            bytes,
            mime,
        })
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Uniform access to the backend. No method returns an error: anything that
/// goes wrong is answered from the mock catalog.
pub struct ApiGateway {
    client: Client,
    config: ApiConfig,
    auth: AuthStub,
}

impl ApiGateway {
    pub fn new(config: ApiConfig, auth: AuthStub) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            config,
            auth,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn auth(&self) -> &AuthStub {
        &self.auth
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Core request path
    // ══════════════════════════════════════════════════════════════════════

    /// Call `endpoint` and decode the answer as `T`, falling back to
    /// `T::fallback()` if neither backend nor catalog yields a `T`.
    pub async fn request<T: Fallback>(&self, endpoint: &str, options: RequestOptions) -> T {
        let value = self.request_value(endpoint, options).await;
        match serde_json::from_value(value) {
            Ok(decoded) => decoded,
            Err(e) => {
                let expected = self.config.use_mock_data && !mock::has_payload(endpoint);
                diagnostics::network_fallback(endpoint, &ApiError::Decode(e), expected);
                T::fallback()
            }
        }
    }

    /// Call `endpoint` and return the raw JSON answer or its catalog payload.
    pub async fn request_value(&self, endpoint: &str, options: RequestOptions) -> Value {
        match self.try_backend(endpoint, options).await {
            Ok(value) => value,
            Err(e) => {
                diagnostics::network_fallback(endpoint, &e, e.is_expected());
                mock::payload(endpoint)
            }
        }
    }

    /// Whether `/health` answers with success inside the health timeout.
    pub async fn backend_healthy(&self) -> bool {
        let probe = self.client.get(self.url(endpoints::HEALTH)).send();
        match tokio::time::timeout(self.config.health_timeout, probe).await {
            Ok(Ok(response)) => response.status().is_success(),
            Ok(Err(e)) => {
                debug!(error = %e, "health probe failed");
                false
            }
            Err(_) => {
                debug!(timeout = ?self.config.health_timeout, "health probe timed out");
                false
            }
        }
    }

    async fn ensure_backend(&self) -> Result<(), ApiError> {
        if self.config.use_mock_data {
            return Err(ApiError::MockMode);
        }
        if self.config.enable_backend_check && !self.backend_healthy().await {
            return Err(ApiError::BackendUnavailable);
        }
        Ok(())
    }

    async fn try_backend(&self, endpoint: &str, options: RequestOptions) -> Result<Value, ApiError> {
        self.ensure_backend().await?;

        let mut request = self.client.request(options.method, self.url(endpoint));
        if let Some(body) = &options.body {
            request = request.json(body);
        }
        self.send(request).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let request = match self.auth.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let timeout = self.config.request_timeout;
        let call = async {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ApiError::Status(status.as_u16()));
            }
            let body = response.bytes().await?;
            Ok::<Value, ApiError>(serde_json::from_slice(&body)?)
        };

        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| ApiError::Timeout(timeout))?
    }

    // ══════════════════════════════════════════════════════════════════════
    // Note upload
    // ══════════════════════════════════════════════════════════════════════

    /// Send a page of notes for OCR and normalize whichever response shape
    /// comes back.
    pub async fn upload_notes(&self, upload: NoteUpload) -> ProcessedNotes {
        let value = match self.try_upload(upload).await {
            Ok(value) => value,
            Err(e) => {
                diagnostics::network_fallback(endpoints::OCR, &e, e.is_expected());
                return ProcessedNotes::fallback();
            }
        };

        notes::normalize_response(value).unwrap_or_else(|e| {
            diagnostics::network_fallback(endpoints::OCR, &ApiError::Decode(e), false);
            ProcessedNotes::fallback()
        })
    }

    async fn try_upload(&self, upload: NoteUpload) -> Result<Value, ApiError> {
        self.ensure_backend().await?;

        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.mime)?;
        let form = Form::new().part("file", part);

        let request = self.client.post(self.url(endpoints::OCR)).multipart(form);
        self.send(request).await
    }

    // ══════════════════════════════════════════════════════════════════════
    // Endpoints
    // ══════════════════════════════════════════════════════════════════════

    pub async fn ask_tutor(&self, question: &str) -> TutorAnswer {
        self.request(
            endpoints::AI_TUTOR,
            RequestOptions::post(json!({ "question": question })),
        )
        .await
    }

    pub async fn check_wellness(&self, text: &str) -> WellnessAssessment {
        self.request(endpoints::WELLNESS, RequestOptions::post(json!({ "text": text })))
            .await
    }

    pub async fn list_quizzes(&self) -> QuizCatalog {
        self.request(endpoints::QUIZ, RequestOptions::get()).await
    }

    pub async fn submit_quiz(&self, quiz_id: &str, answers: &BTreeMap<String, usize>) -> QuizResult {
        self.request(
            endpoints::QUIZ_SUBMIT,
            RequestOptions::post(json!({ "quizId": quiz_id, "answers": answers })),
        )
        .await
    }

    pub async fn upload_teacher_flashcards(&self, cards: &[TeacherCard]) -> UploadAck {
        self.request(
            endpoints::TEACHER_FLASHCARDS,
            RequestOptions::post(json!({ "flashcards": cards })),
        )
        .await
    }

    pub async fn student_engagement(&self) -> EngagementReport {
        self.request(endpoints::TEACHER_ENGAGEMENT, RequestOptions::get())
            .await
    }
}
