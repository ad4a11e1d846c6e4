//! Data models for the locally persisted study collections.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Generate a record identifier: millisecond timestamp plus a random suffix.
pub fn generate_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &suffix[..8])
}

/// Anything stored in a collection and addressed by its identifier.
pub trait Record {
    fn id(&self) -> &str;
}

// ══════════════════════════════════════════════════════════════════════════
// Flashcards
// ══════════════════════════════════════════════════════════════════════════

/// A single flashcard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashCard {
    pub id: String,
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed: Option<DateTime<Utc>>,
}

impl FlashCard {
    pub fn new(question: String, answer: String, subject: Option<String>) -> Self {
        Self {
            id: generate_id(),
            question,
            answer,
            subject,
            created_at: Utc::now(),
            last_reviewed: None,
        }
    }
}

impl Record for FlashCard {
    fn id(&self) -> &str {
        &self.id
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Quizzes
// ══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options` of the right answer.
    #[serde(alias = "correct")]
    pub correct_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Outcome of grading a set of answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub score: usize,
    pub total_questions: usize,
}

impl Quiz {
    /// Grade answers keyed by question id. Unanswered questions count as wrong.
    pub fn grade(&self, answers: &BTreeMap<String, usize>) -> QuizResult {
        let score = self
            .questions
            .iter()
            .filter(|q| answers.get(&q.id) == Some(&q.correct_index))
            .count();

        QuizResult {
            score,
            total_questions: self.questions.len(),
        }
    }
}

impl Record for Quiz {
    fn id(&self) -> &str {
        &self.id
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Wellness
// ══════════════════════════════════════════════════════════════════════════

/// Stress classification of a wellness check-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressLevel {
    Low,
    Medium,
    High,
    #[default]
    #[serde(other)]
    Unknown,
}

impl StressLevel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Unknown => "unknown",
        }
    }
}

/// Deserialize any JSON number into a score clamped to 0..=100.
pub(crate) fn clamped_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Ok(clamp_score(raw))
}

pub(crate) fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellnessRecord {
    pub id: String,
    pub text: String,
    pub stress_level: StressLevel,
    pub suggestion: String,
    #[serde(deserialize_with = "clamped_score")]
    pub wellness_score: u8,
    pub timestamp: DateTime<Utc>,
}

impl WellnessRecord {
    pub fn new(text: String, stress_level: StressLevel, suggestion: String, score: f64) -> Self {
        Self {
            id: generate_id(),
            text,
            stress_level,
            suggestion,
            wellness_score: clamp_score(score),
            timestamp: Utc::now(),
        }
    }
}

impl Record for WellnessRecord {
    fn id(&self) -> &str {
        &self.id
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Chat
// ══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub message: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(message: String, sender: Sender) -> Self {
        Self {
            id: generate_id(),
            message,
            sender,
            timestamp: Utc::now(),
        }
    }
}

impl Record for ChatMessage {
    fn id(&self) -> &str {
        &self.id
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Knowledge maps
// ══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeMap {
    pub id: String,
    pub graphs: Vec<KnowledgeGraph>,
    pub subject: String,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeMap {
    pub fn new(graphs: Vec<KnowledgeGraph>, subject: String) -> Self {
        Self {
            id: generate_id(),
            graphs,
            subject,
            created_at: Utc::now(),
        }
    }
}

impl Record for KnowledgeMap {
    fn id(&self) -> &str {
        &self.id
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Preferences
// ══════════════════════════════════════════════════════════════════════════

/// Interface language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
    Or,
}

impl Language {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Hi => "हिन्दी",
            Self::Or => "ଓଡ଼ିଆ",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Light,
    Dark,
    #[default]
    System,
}

/// Persisted user settings. Missing fields fall back to their defaults so a
/// read always yields a complete record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub language: Language,
    pub theme: ThemePreference,
    pub notifications: bool,
    pub auto_sync: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            language: Language::En,
            theme: ThemePreference::System,
            notifications: true,
            auto_sync: true,
        }
    }
}

/// A partial preferences change; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub language: Option<Language>,
    pub theme: Option<ThemePreference>,
    pub notifications: Option<bool>,
    pub auto_sync: Option<bool>,
}

impl PreferencesUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(self, prefs: &mut UserPreferences) {
        if let Some(language) = self.language {
            prefs.language = language;
        }
        if let Some(theme) = self.theme {
            prefs.theme = theme;
        }
        if let Some(notifications) = self.notifications {
            prefs.notifications = notifications;
        }
        if let Some(auto_sync) = self.auto_sync {
            prefs.auto_sync = auto_sync;
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Export format
// ══════════════════════════════════════════════════════════════════════════

/// Snapshot of every collection, as written to an export file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineData {
    pub flashcards: Vec<FlashCard>,
    pub quizzes: Vec<Quiz>,
    pub wellness_records: Vec<WellnessRecord>,
    pub chat_history: Vec<ChatMessage>,
    pub knowledge_maps: Vec<KnowledgeMap>,
    /// Empty when the store has never synced.
    pub last_sync: String,
}

/// Import payload: only the present fields replace their collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportData {
    pub flashcards: Option<Vec<FlashCard>>,
    pub quizzes: Option<Vec<Quiz>>,
    pub wellness_records: Option<Vec<WellnessRecord>>,
    pub chat_history: Option<Vec<ChatMessage>>,
    pub knowledge_maps: Option<Vec<KnowledgeMap>>,
    pub last_sync: Option<String>,
}

impl From<OfflineData> for ImportData {
    fn from(data: OfflineData) -> Self {
        Self {
            flashcards: Some(data.flashcards),
            quizzes: Some(data.quizzes),
            wellness_records: Some(data.wellness_records),
            chat_history: Some(data.chat_history),
            knowledge_maps: Some(data.knowledge_maps),
            last_sync: Some(data.last_sync),
        }
    }
}
