use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::QuizConfiguration;
use crate::question::QuizQuestion;

/// One answered question, appended to the session log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub prompt: String,
    pub correct_answer: String,
    pub correct_pronunciation: String,
    pub user_answer: String,
    pub user_pronunciation: String,
    pub is_correct: bool,
    pub correct_is_alternate: bool,
    pub user_is_alternate: bool,
}

/// Setup screen the learner is on before a quiz starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigStep {
    #[default]
    Category,
    DifficultyAndCount,
}

impl ConfigStep {
    /// 1-based position, as shown to the learner.
    pub fn number(self) -> usize {
        match self {
            Self::Category => 1,
            Self::DifficultyAndCount => 2,
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::Category => Some(Self::DifficultyAndCount),
            Self::DifficultyAndCount => None,
        }
    }

    pub fn previous(self) -> Option<Self> {
        match self {
            Self::Category => None,
            Self::DifficultyAndCount => Some(Self::Category),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub configuration: QuizConfiguration,
    pub quiz_started: bool,
    pub current_question: Option<QuizQuestion>,
    pub score: usize,
    /// 1-based.
    pub question_index: usize,
    pub selected_answer: Option<String>,
    pub answer_revealed: bool,
    pub completed: bool,
    pub results_visible: bool,
    pub results: Vec<QuizResult>,
    pub used_prompts: HashSet<String>,
    pub last_persisted_at: Option<DateTime<Utc>>,
}

impl SessionState {
    /// Fresh state for `configuration`, nothing answered yet.
    pub fn new(configuration: QuizConfiguration) -> Self {
        Self {
            configuration,
            quiz_started: false,
            current_question: None,
            score: 0,
            question_index: 1,
            selected_answer: None,
            answer_revealed: false,
            completed: false,
            results_visible: false,
            results: Vec::new(),
            used_prompts: HashSet::new(),
            last_persisted_at: None,
        }
    }

    pub fn answered(&self) -> usize {
        self.results.len()
    }

    pub fn correct_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_correct).count()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(QuizConfiguration::default())
    }
}
