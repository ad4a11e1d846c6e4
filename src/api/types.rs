//! Response payloads of the backend endpoints.

use serde::{Deserialize, Serialize};

use crate::models::{clamped_score, Quiz, StressLevel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorAnswer {
    pub answer: String,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellnessAssessment {
    #[serde(default)]
    pub stress_level: StressLevel,
    pub suggestion: String,
    #[serde(deserialize_with = "clamped_score")]
    pub wellness_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizCatalog {
    pub quizzes: Vec<Quiz>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadAck {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementReport {
    #[serde(default)]
    pub engagement: Vec<serde_json::Value>,
}

/// One card in a teacher upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherCard {
    pub question: String,
    pub answer: String,
    pub subject: String,
}
