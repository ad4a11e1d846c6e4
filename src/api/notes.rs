//! Note-upload responses and their normalization.
//!
//! The OCR endpoint answers in one of two upstream shapes: a plain OCR dump
//! (`content` items) or an AI-enhanced payload carrying ready-made cards, a
//! summary and a knowledge graph. Both are reduced to [`ProcessedNotes`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::endpoints;
use crate::diagnostics;
use crate::models::{GraphEdge, GraphNode, KnowledgeGraph};

/// How many text sections of a plain OCR response become cards.
const BASIC_CARD_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteCard {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeMapData {
    #[serde(default)]
    pub graphs: Vec<KnowledgeGraph>,
}

/// Normalized result of processing an uploaded page of notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedNotes {
    pub flashcards: Vec<NoteCard>,
    #[serde(default)]
    pub knowledge_map: KnowledgeMapData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_concepts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_questions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_study_time: Option<String>,
    #[serde(default)]
    pub groq_enhanced: bool,
}

impl ProcessedNotes {
    pub fn basic(flashcards: Vec<NoteCard>, graphs: Vec<KnowledgeGraph>) -> Self {
        Self {
            flashcards,
            knowledge_map: KnowledgeMapData { graphs },
            summary: None,
            key_concepts: None,
            study_questions: None,
            difficulty_level: None,
            estimated_study_time: None,
            groq_enhanced: false,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Upstream shapes
// ══════════════════════════════════════════════════════════════════════════

/// Deserializes only from `true`, so the enhanced shape is picked by its
/// explicit flag rather than by which fields happen to be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "bool")]
pub struct EnhancedFlag;

impl TryFrom<bool> for EnhancedFlag {
    type Error = &'static str;

    fn try_from(value: bool) -> Result<Self, Self::Error> {
        if value {
            Ok(EnhancedFlag)
        } else {
            Err("not an enhanced response")
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamGraph {
    #[serde(default)]
    pub nodes: Option<Vec<GraphNode>>,
    #[serde(default)]
    pub edges: Option<Vec<GraphEdge>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnhancedNotes {
    #[serde(rename = "groq_enhanced")]
    pub flag: EnhancedFlag,
    pub flashcards: Vec<NoteCard>,
    #[serde(default)]
    pub knowledge_map: Option<UpstreamGraph>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub key_concepts: Option<Vec<String>>,
    #[serde(default)]
    pub study_questions: Option<Vec<String>>,
    #[serde(default)]
    pub difficulty_level: Option<String>,
    #[serde(default)]
    pub estimated_study_time: Option<String>,
}

impl EnhancedNotes {
    pub fn normalize(self) -> ProcessedNotes {
        let graphs = match self.knowledge_map {
            Some(UpstreamGraph {
                nodes: Some(nodes),
                edges,
            }) => vec![KnowledgeGraph {
                nodes,
                edges: edges.unwrap_or_default(),
            }],
            _ => Vec::new(),
        };

        ProcessedNotes {
            flashcards: self.flashcards,
            knowledge_map: KnowledgeMapData { graphs },
            summary: self.summary,
            key_concepts: self.key_concepts,
            study_questions: self.study_questions,
            difficulty_level: self.difficulty_level,
            estimated_study_time: self.estimated_study_time,
            groq_enhanced: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentItem {
    Text {
        #[serde(default)]
        text: String,
    },
    Heading {
        #[serde(default)]
        text: String,
    },
    Diagram {
        #[serde(default)]
        title: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BasicNotes {
    pub content: Vec<ContentItem>,
    #[serde(default)]
    pub topic: Option<String>,
}

impl BasicNotes {
    pub fn normalize(self) -> ProcessedNotes {
        let flashcards = self
            .content
            .iter()
            .filter_map(|item| match item {
                ContentItem::Text { text } | ContentItem::Heading { text } => Some(text),
                _ => None,
            })
            .take(BASIC_CARD_LIMIT)
            .enumerate()
            .map(|(i, text)| NoteCard {
                question: format!("What does this note section cover? (Item {})", i + 1),
                answer: if text.is_empty() {
                    "No text extracted".to_string()
                } else {
                    text.clone()
                },
            })
            .collect();

        let topic = self.topic.as_deref().unwrap_or("Main Topic");
        let graphs = self
            .content
            .iter()
            .filter_map(|item| match item {
                ContentItem::Diagram { title } => Some(title.as_deref().unwrap_or("Diagram Content")),
                _ => None,
            })
            .enumerate()
            .map(|(i, title)| {
                let topic_id = format!("topic_{}", i);
                let content_id = format!("content_{}", i);
                KnowledgeGraph {
                    nodes: vec![
                        GraphNode {
                            id: topic_id.clone(),
                            label: topic.to_string(),
                        },
                        GraphNode {
                            id: content_id.clone(),
                            label: title.to_string(),
                        },
                    ],
                    edges: vec![GraphEdge {
                        from: topic_id,
                        to: content_id,
                        label: None,
                    }],
                }
            })
            .collect();

        ProcessedNotes::basic(flashcards, graphs)
    }
}

/// Any response the OCR endpoint may produce. Variants are tried in order.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NotesResponse {
    Enhanced(EnhancedNotes),
    Basic(BasicNotes),
    /// Already in the normalized shape, as the mock catalog serves it.
    Normalized(ProcessedNotes),
}

impl NotesResponse {
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Enhanced(_) => "enhanced",
            Self::Basic(_) => "basic",
            Self::Normalized(_) => "normalized",
        }
    }

    pub fn normalize(self) -> ProcessedNotes {
        match self {
            Self::Enhanced(notes) => notes.normalize(),
            Self::Basic(notes) => notes.normalize(),
            Self::Normalized(notes) => notes,
        }
    }
}

/// Whether `value` carries `groq_enhanced: true` but decoded as another shape.
fn lost_enhancement(value: &Value, response: &NotesResponse) -> bool {
    let claims_enhanced = value.get("groq_enhanced").and_then(Value::as_bool) == Some(true);
    claims_enhanced && !matches!(response, NotesResponse::Enhanced(_))
}

pub fn normalize_response(value: Value) -> Result<ProcessedNotes, serde_json::Error> {
    let response = NotesResponse::deserialize(&value)?;
    if lost_enhancement(&value, &response) {
        diagnostics::response_downgraded(endpoints::OCR, "enhanced", response.shape());
    }
    Ok(response.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn enhanced_response_keeps_ai_fields() {
        let notes = normalize_response(json!({
            "lecture_id": "L1",
            "course": "Biology",
            "topic": "Cells",
            "date": "2026-01-01",
            "content": [],
            "groq_enhanced": true,
            "flashcards": [{ "question": "What is a cell?", "answer": "The unit of life", "category": "basics" }],
            "summary": "Cells are small.",
            "key_concepts": ["cell"],
            "study_questions": ["Name an organelle"],
            "knowledge_map": {
                "nodes": [{ "id": "cell", "label": "Cell", "type": "concept" }],
                "edges": [{ "from": "cell", "to": "cell" }]
            },
            "difficulty_level": "easy",
            "estimated_study_time": "10 minutes"
        }))
        .unwrap();

        assert!(notes.groq_enhanced);
        assert_eq!(notes.flashcards[0].answer, "The unit of life");
        assert_eq!(notes.summary.as_deref(), Some("Cells are small."));
        assert_eq!(notes.knowledge_map.graphs.len(), 1);
        assert_eq!(notes.knowledge_map.graphs[0].nodes[0].label, "Cell");
        assert_eq!(notes.estimated_study_time.as_deref(), Some("10 minutes"));
    }

    #[test]
    fn enhanced_without_map_has_no_graphs() {
        let notes = normalize_response(json!({
            "groq_enhanced": true,
            "flashcards": []
        }))
        .unwrap();
        assert!(notes.groq_enhanced);
        assert!(notes.knowledge_map.graphs.is_empty());
    }

    #[test]
    fn basic_response_builds_cards_and_diagram_graphs() {
        let content: Vec<Value> = (0..7)
            .map(|i| json!({ "type": "text", "text": format!("line {}", i), "confidence": 0.9 }))
            .chain([
                json!({ "type": "heading", "text": "" }),
                json!({ "type": "diagram", "title": "Water cycle", "boxes": [] }),
                json!({ "type": "table" }),
            ])
            .collect();

        let notes = normalize_response(json!({
            "groq_enhanced": false,
            "topic": "Weather",
            "content": content
        }))
        .unwrap();

        assert!(!notes.groq_enhanced);
        assert_eq!(notes.flashcards.len(), BASIC_CARD_LIMIT);
        assert_eq!(
            notes.flashcards[0].question,
            "What does this note section cover? (Item 1)"
        );
        assert_eq!(notes.flashcards[4].answer, "line 4");

        let graph = &notes.knowledge_map.graphs[0];
        assert_eq!(notes.knowledge_map.graphs.len(), 1);
        assert_eq!(graph.nodes[0].label, "Weather");
        assert_eq!(graph.nodes[1].label, "Water cycle");
        assert_eq!(graph.edges[0].from, "topic_0");
        assert_eq!(graph.edges[0].to, "content_0");
    }

    #[test]
    fn empty_text_gets_placeholder_answer() {
        let notes = normalize_response(json!({
            "content": [{ "type": "heading" }]
        }))
        .unwrap();
        assert_eq!(notes.flashcards[0].answer, "No text extracted");
    }

    #[test]
    fn normalized_shape_passes_through() {
        let ready = ProcessedNotes::basic(
            vec![NoteCard {
                question: "q".into(),
                answer: "a".into(),
            }],
            Vec::new(),
        );
        let notes = normalize_response(serde_json::to_value(&ready).unwrap()).unwrap();
        assert_eq!(notes, ready);
    }

    #[test]
    fn broken_enhanced_payload_degrades_to_plain_content() {
        let value = json!({
            "groq_enhanced": true,
            "flashcards": null,
            "topic": "Cells",
            "content": [{ "type": "text", "text": "Cells divide" }]
        });

        let response = NotesResponse::deserialize(&value).unwrap();
        assert_eq!(response.shape(), "basic");
        assert!(lost_enhancement(&value, &response));

        let notes = normalize_response(value).unwrap();
        assert!(!notes.groq_enhanced);
        assert_eq!(notes.flashcards.len(), 1);
        assert_eq!(notes.flashcards[0].answer, "Cells divide");
    }

    #[test]
    fn intact_enhanced_payload_is_not_a_downgrade() {
        let value = json!({ "groq_enhanced": true, "flashcards": [] });
        let response = NotesResponse::deserialize(&value).unwrap();
        assert_eq!(response.shape(), "enhanced");
        assert!(!lost_enhancement(&value, &response));
    }

    #[test]
    fn unrelated_payload_is_rejected() {
        assert!(normalize_response(json!({ "message": "Mock data not available" })).is_err());
    }
}
