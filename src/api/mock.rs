//! Canned responses served when the backend cannot be used.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::endpoints;
use super::notes::{NoteCard, ProcessedNotes};
use super::types::{EngagementReport, QuizCatalog, TutorAnswer, UploadAck, WellnessAssessment};
use crate::models::{
    GraphEdge, GraphNode, KnowledgeGraph, Quiz, QuizQuestion, QuizResult, StressLevel,
};

pub const PLACEHOLDER_MESSAGE: &str = "Mock data not available";

/// A response type with a substitute value for when the backend is out of
/// reach or answers with something unreadable.
pub trait Fallback: DeserializeOwned {
    fn fallback() -> Self;
}

/// The catalog payload for `endpoint`, or the generic placeholder for
/// endpoints without one.
pub fn payload(endpoint: &str) -> Value {
    let value = match endpoint {
        endpoints::AI_TUTOR => serde_json::to_value(TutorAnswer::fallback()),
        endpoints::OCR => serde_json::to_value(ProcessedNotes::fallback()),
        endpoints::WELLNESS => serde_json::to_value(WellnessAssessment::fallback()),
        endpoints::QUIZ => serde_json::to_value(QuizCatalog::fallback()),
        _ => return placeholder(),
    };
    value.unwrap_or_else(|_| placeholder())
}

pub fn has_payload(endpoint: &str) -> bool {
    matches!(
        endpoint,
        endpoints::AI_TUTOR | endpoints::OCR | endpoints::WELLNESS | endpoints::QUIZ
    )
}

pub fn placeholder() -> Value {
    json!({ "message": PLACEHOLDER_MESSAGE })
}

// ══════════════════════════════════════════════════════════════════════════
// Catalog payloads
// ══════════════════════════════════════════════════════════════════════════

impl Fallback for TutorAnswer {
    fn fallback() -> Self {
        Self {
            answer: "I'm here to help you learn! This is a mock response since the backend \
                     is not connected yet. Ask me about any subject and I'll do my best to \
                     assist you."
                .to_string(),
            confidence: 0.9,
        }
    }
}

impl Fallback for WellnessAssessment {
    fn fallback() -> Self {
        Self {
            stress_level: StressLevel::Medium,
            suggestion: "Consider taking a 10-minute break and doing some deep breathing \
                         exercises. Remember to stay hydrated!"
                .to_string(),
            wellness_score: 75,
        }
    }
}

fn question(id: &str, text: &str, options: [&str; 4], correct_index: usize) -> QuizQuestion {
    QuizQuestion {
        id: id.to_string(),
        question: text.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct_index,
    }
}

impl Fallback for QuizCatalog {
    fn fallback() -> Self {
        Self {
            quizzes: vec![Quiz {
                id: "1".to_string(),
                title: "Basic Mathematics".to_string(),
                questions: vec![
                    question("q1", "What is 15 + 27?", ["40", "42", "45", "47"], 1),
                    question("q2", "What is the square root of 64?", ["6", "7", "8", "9"], 2),
                ],
                created_at: Utc::now(),
            }],
        }
    }
}

fn graph(nodes: &[(&str, &str)], edges: &[(&str, &str)]) -> KnowledgeGraph {
    KnowledgeGraph {
        nodes: nodes
            .iter()
            .map(|(id, label)| GraphNode {
                id: id.to_string(),
                label: label.to_string(),
            })
            .collect(),
        edges: edges
            .iter()
            .map(|(from, to)| GraphEdge {
                from: from.to_string(),
                to: to.to_string(),
                label: None,
            })
            .collect(),
    }
}

impl Fallback for ProcessedNotes {
    fn fallback() -> Self {
        Self::basic(
            vec![
                NoteCard {
                    question: "What is photosynthesis?".to_string(),
                    answer: "The process by which plants use sunlight to synthesize foods \
                             with carbon dioxide and water."
                        .to_string(),
                },
                NoteCard {
                    question: "Solve: 2x + 5 = 13".to_string(),
                    answer: "x = 4 (subtract 5 from both sides, then divide by 2)".to_string(),
                },
            ],
            vec![
                graph(
                    &[
                        ("photosynthesis", "Photosynthesis"),
                        ("sunlight", "Sunlight"),
                        ("carbon_dioxide", "Carbon Dioxide"),
                        ("water", "Water"),
                        ("glucose", "Glucose"),
                    ],
                    &[
                        ("sunlight", "photosynthesis"),
                        ("carbon_dioxide", "photosynthesis"),
                        ("water", "photosynthesis"),
                        ("photosynthesis", "glucose"),
                    ],
                ),
                graph(
                    &[
                        ("equation", "2x + 5 = 13"),
                        ("subtract", "Subtract 5"),
                        ("divide", "Divide by 2"),
                        ("solution", "x = 4"),
                    ],
                    &[
                        ("equation", "subtract"),
                        ("subtract", "divide"),
                        ("divide", "solution"),
                    ],
                ),
            ],
        )
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Outside the catalog
// ══════════════════════════════════════════════════════════════════════════

impl Fallback for QuizResult {
    fn fallback() -> Self {
        Self {
            score: 0,
            total_questions: 0,
        }
    }
}

impl Fallback for UploadAck {
    fn fallback() -> Self {
        Self { success: false }
    }
}

impl Fallback for EngagementReport {
    fn fallback() -> Self {
        Self {
            engagement: Vec::new(),
        }
    }
}

impl Fallback for Value {
    fn fallback() -> Self {
        placeholder()
    }
}
