use std::sync::Arc;
use std::time::{Duration, Instant};

use edubridge::api::{
    endpoints, mock, ApiConfig, ApiGateway, AuthStub, Fallback, NoteUpload, ProcessedNotes,
    RequestOptions, Role, TutorAnswer, WellnessAssessment,
};
use edubridge::models::StressLevel;
use edubridge::storage::MemoryStore;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(base_url: String) -> ApiConfig {
    ApiConfig {
        base_url,
        use_mock_data: false,
        enable_backend_check: false,
        request_timeout: Duration::from_secs(2),
        health_timeout: Duration::from_millis(500),
    }
}

fn gateway(config: ApiConfig) -> (ApiGateway, AuthStub) {
    let auth = AuthStub::new(Arc::new(MemoryStore::new()));
    let gateway = ApiGateway::new(config, auth.clone()).unwrap();
    (gateway, auth)
}

fn upload() -> NoteUpload {
    NoteUpload {
        file_name: "page.png".into(),
        bytes: vec![0x89, 0x50, 0x4e, 0x47],
        mime: "image/png".into(),
    }
}

// --- Mock mode ---

#[tokio::test]
async fn mock_mode_never_touches_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let (gateway, _) = gateway(ApiConfig {
        use_mock_data: true,
        ..config(server.uri())
    });

    let assessment = gateway.check_wellness("a bit tired").await;
    assert_eq!(assessment, WellnessAssessment::fallback());
    let notes = gateway.upload_notes(upload()).await;
    assert_eq!(notes, ProcessedNotes::fallback());
}

#[tokio::test]
async fn unknown_endpoint_yields_placeholder() {
    let (gateway, _) = gateway(ApiConfig::default());
    let value = gateway
        .request_value("/api/leaderboard", RequestOptions::get())
        .await;
    assert_eq!(value, mock::placeholder());
}

// --- Real backend ---

#[tokio::test]
async fn backend_answer_is_used_when_available() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoints::WELLNESS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stressLevel": "high",
            "suggestion": "Talk to someone you trust.",
            "wellnessScore": 30
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (gateway, _) = gateway(config(server.uri()));
    let assessment = gateway.check_wellness("exams tomorrow").await;

    assert_eq!(assessment.stress_level, StressLevel::High);
    assert_eq!(assessment.wellness_score, 30);
}

#[tokio::test]
async fn server_error_falls_back_to_catalog() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoints::AI_TUTOR))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (gateway, _) = gateway(config(server.uri()));
    let answer = gateway.ask_tutor("What is gravity?").await;
    assert_eq!(answer, TutorAnswer::fallback());
}

#[tokio::test]
async fn slow_backend_resolves_with_mock_inside_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoints::WELLNESS))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "stressLevel": "low", "suggestion": "", "wellnessScore": 99 }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let (gateway, _) = gateway(ApiConfig {
        request_timeout: Duration::from_millis(200),
        ..config(server.uri())
    });

    let started = Instant::now();
    let assessment = gateway.check_wellness("fine").await;

    assert_eq!(assessment, WellnessAssessment::fallback());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn unreachable_backend_falls_back() {
    let (gateway, _) = gateway(config("http://127.0.0.1:9".to_string()));
    let catalog = gateway.list_quizzes().await;
    assert_eq!(catalog.quizzes[0].title, "Basic Mathematics");
}

#[tokio::test]
async fn unreadable_body_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoints::WELLNESS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
        .mount(&server)
        .await;

    let (gateway, _) = gateway(config(server.uri()));
    assert_eq!(
        gateway.check_wellness("ok").await,
        WellnessAssessment::fallback()
    );
}

#[tokio::test]
async fn failed_health_probe_skips_the_real_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(endpoints::HEALTH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(endpoints::WELLNESS))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (gateway, _) = gateway(ApiConfig {
        enable_backend_check: true,
        ..config(server.uri())
    });

    assert_eq!(
        gateway.check_wellness("ok").await,
        WellnessAssessment::fallback()
    );
}

#[tokio::test]
async fn healthy_backend_is_called() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(endpoints::HEALTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "healthy" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(endpoints::AI_TUTOR))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "answer": "Mass attracts mass.", "confidence": 0.7 })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (gateway, _) = gateway(ApiConfig {
        enable_backend_check: true,
        ..config(server.uri())
    });

    assert!(gateway.backend_healthy().await);
    assert_eq!(gateway.ask_tutor("gravity?").await.answer, "Mass attracts mass.");
}

#[tokio::test]
async fn session_token_is_sent_as_bearer() {
    let server = MockServer::start().await;
    let (gateway, auth) = gateway(config(server.uri()));
    let login = auth.login("teacher@example.com", "pw", Role::Teacher);

    Mock::given(method("POST"))
        .and(path(endpoints::TEACHER_FLASHCARDS))
        .and(header("authorization", format!("Bearer {}", login.token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let ack = gateway.upload_teacher_flashcards(&[]).await;
    assert!(ack.success);
}

// --- Note upload ---

#[tokio::test]
async fn plain_ocr_response_is_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoints::OCR))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lecture_id": "L7",
            "course": "Science",
            "topic": "Plants",
            "date": "2026-02-01",
            "content": [
                { "type": "heading", "text": "Photosynthesis", "confidence": 0.98 },
                { "type": "text", "text": "Light becomes sugar", "confidence": 0.91 },
                { "type": "diagram", "title": "Leaf", "description": "", "boxes": [] }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (gateway, _) = gateway(config(server.uri()));
    let notes = gateway.upload_notes(upload()).await;

    assert!(!notes.groq_enhanced);
    assert_eq!(notes.flashcards.len(), 2);
    assert_eq!(notes.flashcards[0].answer, "Photosynthesis");
    assert_eq!(notes.knowledge_map.graphs.len(), 1);
    assert_eq!(notes.knowledge_map.graphs[0].nodes[0].label, "Plants");
}

#[tokio::test]
async fn enhanced_ocr_response_is_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoints::OCR))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "lecture_id": "L8",
            "course": "Math",
            "topic": "Equations",
            "date": "2026-02-02",
            "content": [],
            "groq_enhanced": true,
            "flashcards": [{ "question": "Solve x + 1 = 2", "answer": "x = 1" }],
            "summary": "Linear equations.",
            "study_questions": ["Why subtract first?"],
            "knowledge_map": { "nodes": [{ "id": "eq", "label": "Equation" }], "edges": [] }
        })))
        .mount(&server)
        .await;

    let (gateway, _) = gateway(config(server.uri()));
    let notes = gateway.upload_notes(upload()).await;

    assert!(notes.groq_enhanced);
    assert_eq!(notes.summary.as_deref(), Some("Linear equations."));
    assert_eq!(notes.flashcards[0].answer, "x = 1");
    assert_eq!(notes.knowledge_map.graphs[0].nodes[0].id, "eq");
}

#[tokio::test]
async fn failed_upload_serves_catalog_notes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(endpoints::OCR))
        .respond_with(ResponseTemplate::new(413))
        .mount(&server)
        .await;

    let (gateway, _) = gateway(config(server.uri()));
    assert_eq!(gateway.upload_notes(upload()).await, ProcessedNotes::fallback());
}
