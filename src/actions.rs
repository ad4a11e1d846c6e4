//! User-facing flows: call the backend (or its stand-in), turn the answer into
//! a record, persist it, and hand it back for display.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, info};

use crate::api::{ApiGateway, NoteUpload, ProcessedNotes, TeacherCard};
use crate::models::{
    ChatMessage, FlashCard, KnowledgeMap, Quiz, QuizResult, Sender, WellnessRecord,
};
use crate::storage::LocalStore;

/// Subject given to cards that arrive without one.
pub const DEFAULT_SUBJECT: &str = "General";

#[derive(Error, Debug, PartialEq)]
pub enum ActionError {
    #[error("{0} must not be empty")]
    EmptyInput(&'static str),
}

pub type ActionResult<T> = std::result::Result<T, ActionError>;

fn required(value: &str, field: &'static str) -> ActionResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ActionError::EmptyInput(field))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Records produced by processing a page of notes.
#[derive(Debug, Clone)]
pub struct NotesImport {
    pub flashcards: Vec<FlashCard>,
    pub knowledge_map: Option<KnowledgeMap>,
    pub notes: ProcessedNotes,
}

pub struct StudyActions {
    store: LocalStore,
    gateway: ApiGateway,
}

impl StudyActions {
    pub fn new(store: LocalStore, gateway: ApiGateway) -> Self {
        Self { store, gateway }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn gateway(&self) -> &ApiGateway {
        &self.gateway
    }

    /// Ask the tutor. Both the question and the answer join the chat history.
    pub async fn ask_tutor(&self, question: &str) -> ActionResult<(ChatMessage, ChatMessage)> {
        let question = required(question, "question")?;

        let asked = ChatMessage::new(question, Sender::User);
        self.store.chat.add(asked.clone());

        let answer = self.gateway.ask_tutor(&asked.message).await;
        let reply = ChatMessage::new(answer.answer, Sender::Ai);
        self.store.chat.add(reply.clone());

        debug!(confidence = answer.confidence, "tutor answered");
        Ok((asked, reply))
    }

    pub async fn check_wellness(&self, text: &str) -> ActionResult<WellnessRecord> {
        let text = required(text, "wellness text")?;

        let assessment = self.gateway.check_wellness(&text).await;
        let record = WellnessRecord::new(
            text,
            assessment.stress_level,
            assessment.suggestion,
            f64::from(assessment.wellness_score),
        );
        self.store.wellness.add(record.clone());

        info!(
            stress = record.stress_level.name(),
            score = record.wellness_score,
            "wellness check recorded"
        );
        Ok(record)
    }

    /// Turn an uploaded page into flashcards and, when the page yields any
    /// graphs, a knowledge map.
    pub async fn process_notes(&self, upload: NoteUpload) -> NotesImport {
        let notes = self.gateway.upload_notes(upload).await;

        let flashcards: Vec<FlashCard> = notes
            .flashcards
            .iter()
            .map(|card| {
                FlashCard::new(
                    card.question.clone(),
                    card.answer.clone(),
                    Some(DEFAULT_SUBJECT.to_string()),
                )
            })
            .collect();
        self.store.flashcards.add_many(flashcards.clone());

        let knowledge_map = if notes.knowledge_map.graphs.is_empty() {
            None
        } else {
            let subject = flashcards
                .first()
                .and_then(|c| c.subject.clone())
                .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
            let map = KnowledgeMap::new(notes.knowledge_map.graphs.clone(), subject);
            self.store.knowledge_maps.add(map.clone());
            Some(map)
        };

        info!(
            cards = flashcards.len(),
            knowledge_map = knowledge_map.is_some(),
            enhanced = notes.groq_enhanced,
            "processed notes"
        );

        NotesImport {
            flashcards,
            knowledge_map,
            notes,
        }
    }

    /// Save a teacher-authored card locally, then share it with the backend.
    pub async fn create_flashcard(
        &self,
        question: &str,
        answer: &str,
        subject: Option<&str>,
    ) -> ActionResult<FlashCard> {
        let question = required(question, "question")?;
        let answer = required(answer, "answer")?;
        let subject = subject
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SUBJECT)
            .to_string();

        let card = FlashCard::new(question, answer, Some(subject.clone()));
        self.store.flashcards.add(card.clone());

        let ack = self
            .gateway
            .upload_teacher_flashcards(&[TeacherCard {
                question: card.question.clone(),
                answer: card.answer.clone(),
                subject,
            }])
            .await;
        if !ack.success {
            debug!(id = %card.id, "flashcard kept locally only");
        }

        Ok(card)
    }

    pub fn review_flashcard(&self, id: &str) -> bool {
        self.store.flashcards.update_review_date(id)
    }

    /// Replace the local quizzes with the backend's list and stamp the sync.
    pub async fn sync_quizzes(&self) -> Vec<Quiz> {
        let catalog = self.gateway.list_quizzes().await;
        if self.store.quizzes.save(&catalog.quizzes) {
            self.store.sync.set_last_sync(None);
        }
        info!(count = catalog.quizzes.len(), "synced quizzes");
        catalog.quizzes
    }

    /// Submit answers. A quiz held locally is graded locally; otherwise the
    /// backend's score is used.
    pub async fn submit_quiz(&self, quiz_id: &str, answers: &BTreeMap<String, usize>) -> QuizResult {
        let remote = self.gateway.submit_quiz(quiz_id, answers).await;

        match self.store.quizzes.find(quiz_id) {
            Some(quiz) => quiz.grade(answers),
            None => remote,
        }
    }
}
