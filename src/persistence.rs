//! Session snapshots in local storage.
//!
//! Persistence is an optimization: every failure here is logged and
//! treated as "no snapshot".

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::QuizConfiguration;
use crate::error::StorageError;
use crate::question::QuizQuestion;
use crate::session::{QuizResult, SessionState};
use crate::storage::KeyValueStore;

pub const SESSION_KEY: &str = "cantonese-quiz-state";

/// Snapshots older than this are ignored.
pub const MAX_SNAPSHOT_AGE_HOURS: i64 = 24;

/// Wire format of a persisted session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default)]
    pub quiz_started: bool,
    #[serde(default)]
    pub configuration: Option<QuizConfiguration>,
    #[serde(default)]
    pub current_question: Option<QuizQuestion>,
    #[serde(default)]
    pub score: usize,
    #[serde(default)]
    pub question_number: usize,
    #[serde(default)]
    pub selected_answer: Option<String>,
    #[serde(default)]
    pub show_result: bool,
    #[serde(default)]
    pub quiz_complete: bool,
    #[serde(default)]
    pub show_detailed_results: bool,
    #[serde(default)]
    pub quiz_results: Vec<QuizResult>,
    #[serde(default)]
    pub used_words: Vec<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl SessionSnapshot {
    pub fn capture(state: &SessionState, at: DateTime<Utc>) -> Self {
        let mut used_words: Vec<String> = state.used_prompts.iter().cloned().collect();
        used_words.sort();
        Self {
            quiz_started: state.quiz_started,
            configuration: Some(state.configuration.clone()),
            current_question: state.current_question.clone(),
            score: state.score,
            question_number: state.question_index,
            selected_answer: state.selected_answer.clone(),
            show_result: state.answer_revealed,
            quiz_complete: state.completed,
            show_detailed_results: state.results_visible,
            quiz_results: state.results.clone(),
            used_words,
            timestamp: Some(at.timestamp_millis()),
        }
    }

    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.captured_at()
            .is_some_and(|at| now - at < Duration::hours(MAX_SNAPSHOT_AGE_HOURS))
    }

    /// Rebuild the session. `fallback` is used when the snapshot predates
    /// configuration being stored alongside it.
    pub fn into_state(self, fallback: &QuizConfiguration) -> SessionState {
        let last_persisted_at = self.captured_at();
        SessionState {
            configuration: self.configuration.unwrap_or_else(|| fallback.clone()),
            quiz_started: self.quiz_started,
            current_question: self.current_question,
            score: self.score,
            question_index: self.question_number.max(1),
            selected_answer: self.selected_answer,
            answer_revealed: self.show_result,
            completed: self.quiz_complete,
            results_visible: self.show_detailed_results,
            results: self.quiz_results,
            used_prompts: self.used_words.into_iter().collect(),
            last_persisted_at,
        }
    }
}

/// Reads and writes the single session slot.
#[derive(Debug, Clone)]
pub struct SessionPersistence<S> {
    store: S,
}

impl<S: KeyValueStore> SessionPersistence<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn save(&self, state: &SessionState) -> Option<DateTime<Utc>> {
        self.save_at(state, Utc::now())
    }

    /// Returns the capture time when the write succeeded.
    pub fn save_at(&self, state: &SessionState, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let snapshot = SessionSnapshot::capture(state, at);
        let written = serde_json::to_string(&snapshot)
            .map_err(StorageError::from)
            .and_then(|raw| self.store.set(SESSION_KEY, &raw));
        match written {
            Ok(()) => {
                debug!(question = state.question_index, "session snapshot saved");
                Some(at)
            }
            Err(err) => {
                warn!(%err, "unable to save session snapshot");
                None
            }
        }
    }

    pub fn load(&self) -> Option<SessionState> {
        self.load_at(Utc::now())
    }

    pub fn load_at(&self, now: DateTime<Utc>) -> Option<SessionState> {
        self.load_snapshot_at(now)
            .map(|s| s.into_state(&QuizConfiguration::default()))
    }

    /// The stored snapshot if it exists, parses, is fresh and belongs to a
    /// started quiz.
    pub fn load_snapshot_at(&self, now: DateTime<Utc>) -> Option<SessionSnapshot> {
        let raw = match self.store.get(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(%err, "unable to read session snapshot");
                return None;
            }
        };

        let snapshot: SessionSnapshot = match serde_json::from_str(&raw) {
            Ok(s) => s,
            Err(err) => {
                debug!(%err, "ignoring malformed session snapshot");
                return None;
            }
        };

        if !snapshot.is_fresh(now) {
            debug!(timestamp = ?snapshot.timestamp, "ignoring stale session snapshot");
            return None;
        }
        if !snapshot.quiz_started {
            return None;
        }
        Some(snapshot)
    }

    pub fn clear(&self) {
        if let Err(err) = self.store.remove(SESSION_KEY) {
            warn!(%err, "unable to clear session snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CategoryFilter, DifficultyFilter};
    use crate::storage::tests::BrokenStore;
    use crate::storage::MemoryStore;
    use crate::vocabulary::tests::entry;

    fn in_progress_state() -> SessionState {
        let configuration = QuizConfiguration {
            category: CategoryFilter::Named("animals".into()),
            difficulty: DifficultyFilter::Easy,
            question_count: 5,
        };
        let mut state = SessionState::new(configuration);
        state.quiz_started = true;
        state.current_question = Some(QuizQuestion::from_entries(
            "fisk",
            vec![entry("hund", "狗", 1), entry("fisk", "鱼", 1), entry("ko", "牛", 1)],
            false,
        ));
        state.score = 1;
        state.question_index = 3;
        state.results = vec![
            QuizResult {
                prompt: "katt".into(),
                correct_answer: "猫".into(),
                correct_pronunciation: "katt1".into(),
                user_answer: "猫".into(),
                user_pronunciation: "katt1".into(),
                is_correct: true,
                correct_is_alternate: false,
                user_is_alternate: false,
            },
            QuizResult {
                prompt: "gris".into(),
                correct_answer: "猪".into(),
                correct_pronunciation: "gris1".into(),
                user_answer: "牛".into(),
                user_pronunciation: "ko1".into(),
                is_correct: false,
                correct_is_alternate: false,
                user_is_alternate: false,
            },
        ];
        state.used_prompts = ["katt", "gris", "fisk"].iter().map(|s| s.to_string()).collect();
        state
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let persistence = SessionPersistence::new(MemoryStore::default());
        let state = in_progress_state();
        let now = Utc::now();

        assert_eq!(persistence.save_at(&state, now), Some(now));
        let loaded = persistence.load_at(now).unwrap();

        assert_eq!(loaded.score, state.score);
        assert_eq!(loaded.question_index, state.question_index);
        assert_eq!(loaded.results, state.results);
        assert_eq!(loaded.used_prompts, state.used_prompts);
        assert_eq!(loaded.current_question, state.current_question);
        assert_eq!(loaded.configuration, state.configuration);
    }

    #[test]
    fn test_used_prompts_are_stored_as_sorted_sequence() {
        let store = MemoryStore::default();
        let persistence = SessionPersistence::new(store.clone());
        persistence.save_at(&in_progress_state(), Utc::now());

        let raw = store.get(SESSION_KEY).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(json["usedWords"], serde_json::json!(["fisk", "gris", "katt"]));
        assert!(json["timestamp"].is_i64());
    }

    #[test]
    fn test_stale_snapshot_is_ignored() {
        let persistence = SessionPersistence::new(MemoryStore::default());
        let now = Utc::now();
        persistence.save_at(&in_progress_state(), now - Duration::hours(25));

        assert!(persistence.load_at(now).is_none());
    }

    #[test]
    fn test_snapshot_just_inside_window_is_restored() {
        let persistence = SessionPersistence::new(MemoryStore::default());
        let now = Utc::now();
        persistence.save_at(&in_progress_state(), now - Duration::hours(23));

        assert!(persistence.load_at(now).is_some());
    }

    #[test]
    fn test_snapshot_without_timestamp_is_ignored() {
        let store = MemoryStore::default();
        store
            .set(SESSION_KEY, r#"{"quizStarted": true, "score": 2}"#)
            .unwrap();

        assert!(SessionPersistence::new(store).load().is_none());
    }

    #[test]
    fn test_unstarted_snapshot_is_ignored() {
        let persistence = SessionPersistence::new(MemoryStore::default());
        let mut state = in_progress_state();
        state.quiz_started = false;
        persistence.save(&state);

        assert!(persistence.load().is_none());
    }

    #[test]
    fn test_malformed_snapshot_is_ignored() {
        let store = MemoryStore::default();
        store.set(SESSION_KEY, "{\"quizStarted\": tru").unwrap();

        assert!(SessionPersistence::new(store).load().is_none());
    }

    #[test]
    fn test_partial_snapshot_gets_defaults() {
        let store = MemoryStore::default();
        let ts = Utc::now().timestamp_millis();
        store
            .set(
                SESSION_KEY,
                &format!(r#"{{"quizStarted": true, "questionNumber": 0, "timestamp": {ts}}}"#),
            )
            .unwrap();
        let fallback = QuizConfiguration {
            question_count: 12,
            ..QuizConfiguration::default()
        };

        let state = SessionPersistence::new(store)
            .load_snapshot_at(Utc::now())
            .unwrap()
            .into_state(&fallback);

        assert_eq!(state.question_index, 1);
        assert_eq!(state.score, 0);
        assert_eq!(state.configuration.question_count, 12);
        assert!(state.results.is_empty());
    }

    #[test]
    fn test_clear_removes_slot() {
        let store = MemoryStore::default();
        let persistence = SessionPersistence::new(store.clone());
        persistence.save(&in_progress_state());

        persistence.clear();

        assert_eq!(store.get(SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn test_storage_failures_are_swallowed() {
        let persistence = SessionPersistence::new(BrokenStore);

        assert_eq!(persistence.save(&in_progress_state()), None);
        assert!(persistence.load().is_none());
        persistence.clear();
    }
}
