//! A typed collection persisted as one JSON array under one key.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::KeyValueStore;
use crate::diagnostics;
use crate::models::{FlashCard, Record, WellnessRecord};

/// Read and parse the JSON value under `key`. Absent, unreadable and
/// unparsable values all come back as `None`.
pub(crate) fn read_json<T: DeserializeOwned>(medium: &dyn KeyValueStore, key: &str) -> Option<T> {
    match medium.get_item(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                diagnostics::storage_degraded("parse", key, &e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            diagnostics::storage_degraded("read", key, &e);
            None
        }
    }
}

/// Serialize `value` and store it under `key` in one write.
pub(crate) fn write_json<T: Serialize + ?Sized>(medium: &dyn KeyValueStore, key: &str, value: &T) -> bool {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            diagnostics::storage_degraded("serialize", key, &e);
            return false;
        }
    };

    match medium.set_item(key, &json) {
        Ok(()) => true,
        Err(e) => {
            diagnostics::storage_degraded("write", key, &e);
            false
        }
    }
}

/// Insertion-ordered records of one type.
pub struct Collection<T> {
    medium: Arc<dyn KeyValueStore>,
    key: &'static str,
    cap: Option<usize>,
    _records: PhantomData<fn() -> T>,
}

impl<T> Collection<T>
where
    T: Record + Serialize + DeserializeOwned,
{
    pub fn new(medium: Arc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self {
            medium,
            key,
            cap: None,
            _records: PhantomData,
        }
    }

    /// Keep at most `cap` records; appends evict the oldest first.
    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = Some(cap);
        self
    }

    pub fn get_all(&self) -> Vec<T> {
        read_json(self.medium.as_ref(), self.key).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.get_all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, id: &str) -> Option<T> {
        self.get_all().into_iter().find(|r| r.id() == id)
    }

    /// Replace the whole collection.
    pub fn save(&self, records: &[T]) -> bool {
        write_json(self.medium.as_ref(), self.key, records)
    }

    pub fn add(&self, record: T) -> bool {
        self.add_many(vec![record])
    }

    /// Append a batch in a single write.
    pub fn add_many(&self, records: Vec<T>) -> bool {
        let mut all = self.get_all();
        all.extend(records);

        if let Some(cap) = self.cap {
            if all.len() > cap {
                let overflow = all.len() - cap;
                all.drain(..overflow);
            }
        }

        self.save(&all)
    }

    /// Drop the record with `id`. Removing an unknown id still rewrites the
    /// collection and reports success.
    pub fn remove(&self, id: &str) -> bool {
        let mut all = self.get_all();
        all.retain(|r| r.id() != id);
        self.save(&all)
    }

    /// Store an empty array. A key that holds nothing is left unwritten.
    pub fn clear(&self) -> bool {
        if let Ok(None) = self.medium.get_item(self.key) {
            return true;
        }
        self.save(&[])
    }
}

impl Collection<FlashCard> {
    /// Stamp `lastReviewed` with the current time. Unknown ids are a no-op.
    pub fn update_review_date(&self, id: &str) -> bool {
        let mut all = self.get_all();
        let now = Utc::now();
        for card in all.iter_mut().filter(|c| c.id == id) {
            card.last_reviewed = Some(now);
        }
        self.save(&all)
    }
}

impl Collection<WellnessRecord> {
    /// Records from the last 30 days, boundary inclusive.
    pub fn last_30_days(&self) -> Vec<WellnessRecord> {
        self.last_30_days_from(Utc::now())
    }

    pub fn last_30_days_from(&self, now: DateTime<Utc>) -> Vec<WellnessRecord> {
        let cutoff = now - Duration::days(30);
        self.get_all()
            .into_iter()
            .filter(|r| r.timestamp >= cutoff)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChatMessage, Sender, StressLevel};
    use crate::storage::MemoryStore;

    fn chat(medium: Arc<dyn KeyValueStore>) -> Collection<ChatMessage> {
        Collection::new(medium, "edubridge_chat").with_cap(100)
    }

    fn wellness_at(id: &str, timestamp: DateTime<Utc>) -> WellnessRecord {
        WellnessRecord {
            id: id.to_string(),
            text: "ok".into(),
            stress_level: StressLevel::Low,
            suggestion: "keep going".into(),
            wellness_score: 80,
            timestamp,
        }
    }

    #[test]
    fn adds_survive_round_trip_in_order() {
        let medium: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let cards: Collection<FlashCard> = Collection::new(medium.clone(), "edubridge_flashcards");

        let added: Vec<FlashCard> = (0..5)
            .map(|i| FlashCard::new(format!("q{}", i), format!("a{}", i), None))
            .collect();
        for card in &added {
            assert!(cards.add(card.clone()));
        }

        let reopened: Collection<FlashCard> = Collection::new(medium, "edubridge_flashcards");
        assert_eq!(reopened.get_all(), added);
    }

    #[test]
    fn remove_filters_and_tolerates_unknown_ids() {
        let medium: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let cards: Collection<FlashCard> = Collection::new(medium, "edubridge_flashcards");
        let keep = FlashCard::new("keep".into(), "a".into(), None);
        let drop = FlashCard::new("drop".into(), "a".into(), None);
        cards.add_many(vec![keep.clone(), drop.clone()]);

        assert!(cards.remove(&drop.id));
        assert!(cards.get_all().iter().all(|c| c.id != drop.id));
        assert!(cards.remove("missing"));
        assert_eq!(cards.get_all(), vec![keep]);
    }

    #[test]
    fn chat_cap_evicts_oldest() {
        let medium: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let history = chat(medium);
        let messages: Vec<ChatMessage> = (0..100)
            .map(|i| ChatMessage::new(format!("m{}", i), Sender::User))
            .collect();
        history.save(&messages);

        assert!(history.add(ChatMessage::new("newest".into(), Sender::Ai)));

        let all = history.get_all();
        assert_eq!(all.len(), 100);
        assert_eq!(all[0].message, "m1");
        assert_eq!(all[99].message, "newest");
    }

    #[test]
    fn corrupted_value_reads_as_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set_item("edubridge_chat", "{not json").unwrap();
        let history = chat(store);
        assert!(history.get_all().is_empty());
        // The next append starts a fresh collection.
        assert!(history.add(ChatMessage::new("hi".into(), Sender::User)));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn unavailable_medium_degrades_quietly() {
        let store = Arc::new(MemoryStore::new());
        store.set_unavailable(true);
        let history = chat(store);
        assert!(history.get_all().is_empty());
        assert!(!history.add(ChatMessage::new("hi".into(), Sender::User)));
        assert!(!history.clear());
    }

    #[test]
    fn quota_denial_returns_false() {
        let store = Arc::new(MemoryStore::new().with_quota(32));
        let cards: Collection<FlashCard> = Collection::new(store, "edubridge_flashcards");
        assert!(!cards.add(FlashCard::new("a long question".into(), "a long answer".into(), None)));
        assert!(cards.get_all().is_empty());
    }

    #[test]
    fn review_date_updates_only_matching_card() {
        let medium: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let cards: Collection<FlashCard> = Collection::new(medium, "edubridge_flashcards");
        let a = FlashCard::new("a".into(), "1".into(), None);
        let b = FlashCard::new("b".into(), "2".into(), None);
        cards.add_many(vec![a.clone(), b.clone()]);

        assert!(cards.update_review_date(&a.id));
        assert!(cards.update_review_date("missing"));

        let all = cards.get_all();
        assert!(all[0].last_reviewed.is_some());
        assert!(all[1].last_reviewed.is_none());
    }

    #[test]
    fn thirty_day_window_is_inclusive() {
        let medium: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let records: Collection<WellnessRecord> = Collection::new(medium, "edubridge_wellness");
        let now = Utc::now();
        records.save(&[
            wellness_at("old", now - Duration::days(31)),
            wellness_at("edge", now - Duration::days(30)),
            wellness_at("recent", now - Duration::days(29)),
        ]);

        let ids: Vec<String> = records
            .last_30_days_from(now)
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["edge".to_string(), "recent".to_string()]);
    }
}
