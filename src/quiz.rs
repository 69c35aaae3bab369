//! The quiz session state machine.
//!
//! `QuizSession` owns the session state and is the only thing that mutates
//! it. Every transition either completes or returns a [`QuizError`] and
//! leaves the state as it was. While a quiz is running each mutation is
//! followed by a best-effort snapshot write.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::{CategoryFilter, DifficultyFilter, QuizConfiguration, SettingsStore};
use crate::error::QuizError;
use crate::i18n::{MessageKey, Translate};
use crate::persistence::SessionPersistence;
use crate::question::{QuestionGenerator, QuizQuestion, MIN_POOL_SIZE};
use crate::session::{ConfigStep, QuizResult, SessionState};
use crate::storage::KeyValueStore;
use crate::vocabulary::{Vocabulary, VocabularyEntry};

/// Where the learner currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Configuring(ConfigStep),
    InsufficientVocabulary { found: usize, needed: usize },
    InProgress,
    AnswerRevealed,
    /// Started, but no question could be generated.
    Stalled,
    /// Finished without the detailed results on screen.
    Completed,
    DetailedResults,
}

/// A single configuration field change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigUpdate {
    Category(CategoryFilter),
    Difficulty(DifficultyFilter),
    QuestionCount(usize),
}

/// Pool size for a configuration against what starting it requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Availability {
    pub found: usize,
    pub needed: usize,
}

impl Availability {
    pub fn for_configuration(vocabulary: &Vocabulary, cfg: &QuizConfiguration) -> Self {
        Self {
            found: vocabulary.pool(cfg).len(),
            needed: cfg.question_count.max(MIN_POOL_SIZE),
        }
    }

    pub fn is_sufficient(&self) -> bool {
        self.found >= self.needed
    }
}

/// Correct answers over answered questions, e.g. `3/4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreLine {
    pub correct: usize,
    pub answered: usize,
}

impl fmt::Display for ScoreLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.correct, self.answered)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultsSummary {
    pub correct: usize,
    pub total: usize,
    pub percentage: u32,
}

impl ResultsSummary {
    pub fn new(correct: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            (correct as f64 / total as f64 * 100.0).round() as u32
        };
        Self {
            correct,
            total,
            percentage,
        }
    }

    /// Encouragement tier for the percentage.
    pub fn score_message(&self) -> MessageKey {
        match self.percentage {
            80.. => MessageKey::Excellent,
            60..=79 => MessageKey::Good,
            40..=59 => MessageKey::KeepPracticing,
            _ => MessageKey::TryAgain,
        }
    }

    pub fn describe<T: Translate + ?Sized>(&self, t: &T) -> String {
        let params: [(&str, &dyn fmt::Display); 3] = [
            ("correct", &self.correct),
            ("total", &self.total),
            ("percentage", &self.percentage),
        ];
        t.format(MessageKey::ResultsSummary, &params)
    }
}

pub struct QuizSession<S, R = StdRng> {
    vocabulary: Vocabulary,
    universe: Vec<VocabularyEntry>,
    settings: SettingsStore<S>,
    persistence: SessionPersistence<S>,
    state: SessionState,
    config_step: ConfigStep,
    insufficient: Option<Availability>,
    use_alternate: bool,
    rng: R,
}

impl<S: KeyValueStore + Clone> QuizSession<S, StdRng> {
    pub fn new(vocabulary: Vocabulary, store: S, use_alternate: bool) -> Self {
        Self::with_rng(vocabulary, store, use_alternate, StdRng::from_entropy())
    }
}

impl<S: KeyValueStore + Clone, R: Rng> QuizSession<S, R> {
    /// Build a session in setup, with the last used filters loaded from `store`.
    pub fn with_rng(vocabulary: Vocabulary, store: S, use_alternate: bool, rng: R) -> Self {
        let settings = SettingsStore::new(store.clone());
        let configuration = settings.load_configuration();
        let universe = vocabulary.universe();
        Self {
            vocabulary,
            universe,
            settings,
            persistence: SessionPersistence::new(store),
            state: SessionState::new(configuration),
            config_step: ConfigStep::default(),
            insufficient: None,
            use_alternate,
            rng,
        }
    }

    pub fn phase(&self) -> Phase {
        if let Some(Availability { found, needed }) = self.insufficient {
            return Phase::InsufficientVocabulary { found, needed };
        }
        let state = &self.state;
        if !state.quiz_started {
            Phase::Configuring(self.config_step)
        } else if state.results_visible {
            Phase::DetailedResults
        } else if state.completed {
            Phase::Completed
        } else if state.current_question.is_none() {
            Phase::Stalled
        } else if state.answer_revealed {
            Phase::AnswerRevealed
        } else {
            Phase::InProgress
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn configuration(&self) -> &QuizConfiguration {
        &self.state.configuration
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.state.current_question.as_ref()
    }

    pub fn results(&self) -> &[QuizResult] {
        &self.state.results
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn use_alternate(&self) -> bool {
        self.use_alternate
    }

    pub fn last_persisted_at(&self) -> Option<DateTime<Utc>> {
        self.state.last_persisted_at
    }

    pub fn availability(&self) -> Availability {
        Availability::for_configuration(&self.vocabulary, &self.state.configuration)
    }

    /// Change one filter. Only allowed before a quiz starts; clears a
    /// pending insufficient-vocabulary condition.
    pub fn configure(&mut self, update: ConfigUpdate) -> Result<(), QuizError> {
        if self.state.quiz_started {
            return Err(QuizError::QuizInProgress);
        }
        let cfg = &mut self.state.configuration;
        match update {
            ConfigUpdate::Category(category) => cfg.category = category,
            ConfigUpdate::Difficulty(difficulty) => cfg.difficulty = difficulty,
            ConfigUpdate::QuestionCount(count) => cfg.question_count = count.max(1),
        }
        debug!(configuration = ?self.state.configuration, "configuration changed");
        self.settings.save_configuration(&self.state.configuration);
        self.insufficient = None;
        Ok(())
    }

    /// Move to the next setup step; on the last step this starts the quiz.
    pub fn next_config_step(&mut self) -> Result<(), QuizError> {
        if self.state.quiz_started {
            return Err(QuizError::QuizInProgress);
        }
        match self.config_step.next() {
            Some(step) => {
                self.config_step = step;
                Ok(())
            }
            None => self.start(),
        }
    }

    pub fn previous_config_step(&mut self) -> Result<(), QuizError> {
        if self.state.quiz_started {
            return Err(QuizError::QuizInProgress);
        }
        if let Some(step) = self.config_step.previous() {
            self.config_step = step;
        }
        Ok(())
    }

    /// Leave the insufficient-vocabulary message and return to the first setup step.
    pub fn back_to_setup(&mut self) {
        self.insufficient = None;
        if !self.state.quiz_started {
            self.config_step = ConfigStep::Category;
        }
    }

    pub fn start(&mut self) -> Result<(), QuizError> {
        if self.state.quiz_started {
            return Err(QuizError::QuizInProgress);
        }

        let availability = self.availability();
        if !availability.is_sufficient() {
            info!(
                found = availability.found,
                needed = availability.needed,
                "not enough vocabulary for the selected filters"
            );
            self.insufficient = Some(availability);
            return Err(QuizError::InsufficientVocabulary {
                found: availability.found,
                needed: availability.needed,
            });
        }

        self.persistence.clear();
        self.settings.save_configuration(&self.state.configuration);

        let configuration = self.state.configuration.clone();
        info!(
            category = %configuration.category,
            difficulty = %configuration.difficulty,
            questions = configuration.question_count,
            "starting quiz"
        );
        self.state = SessionState::new(configuration);
        self.state.quiz_started = true;
        self.insufficient = None;
        self.config_step = ConfigStep::Category;
        self.generate_question();
        self.persist();
        Ok(())
    }

    /// Answer by option slot.
    pub fn select_option(&mut self, index: usize) -> Result<Option<bool>, QuizError> {
        let answer = self
            .state
            .current_question
            .as_ref()
            .ok_or(QuizError::NoQuestion)?
            .options
            .get(index)
            .cloned()
            .ok_or(QuizError::NoSuchOption { index })?;
        self.select_answer(&answer)
    }

    /// Record an answer for the current question.
    ///
    /// Returns `Ok(None)` when the question was already answered; the first
    /// selection wins. Otherwise returns whether the answer was correct.
    pub fn select_answer(&mut self, answer: &str) -> Result<Option<bool>, QuizError> {
        if !self.state.quiz_started || self.state.completed {
            return Err(QuizError::NotInProgress);
        }
        if self.state.selected_answer.is_some() {
            return Ok(None);
        }
        let question = self
            .state
            .current_question
            .as_ref()
            .ok_or(QuizError::NoQuestion)?;
        let slot = question
            .position_of(answer)
            .ok_or_else(|| QuizError::UnknownAnswer(answer.to_string()))?;

        let is_correct = answer == question.correct_answer;
        let result = QuizResult {
            prompt: question.prompt.clone(),
            correct_answer: question.correct_answer.clone(),
            correct_pronunciation: question.correct_pronunciation.clone(),
            user_answer: answer.to_string(),
            user_pronunciation: question
                .option_pronunciations
                .get(slot)
                .cloned()
                .unwrap_or_default(),
            is_correct,
            correct_is_alternate: question.correct_is_alternate,
            user_is_alternate: question
                .option_is_alternate
                .get(slot)
                .copied()
                .unwrap_or(false),
        };
        debug!(prompt = %result.prompt, is_correct, "answer recorded");

        self.state.results.push(result);
        self.state.selected_answer = Some(answer.to_string());
        self.state.answer_revealed = true;
        if is_correct {
            self.state.score += 1;
        }
        self.persist();
        Ok(Some(is_correct))
    }

    /// Go to the next question, or finish and show results after the last one.
    pub fn advance(&mut self) -> Result<(), QuizError> {
        if !self.state.quiz_started || self.state.completed {
            return Err(QuizError::NotInProgress);
        }
        if self.state.selected_answer.is_none() {
            return Err(QuizError::NotAnswered);
        }

        if self.state.question_index >= self.state.configuration.question_count {
            self.state.completed = true;
            self.state.results_visible = true;
            info!(
                score = self.state.score,
                total = self.state.configuration.question_count,
                "quiz complete"
            );
        } else {
            self.state.question_index += 1;
            self.state.selected_answer = None;
            self.state.answer_revealed = false;
            self.generate_question();
        }
        self.persist();
        Ok(())
    }

    /// Show the detailed results of a completed quiz.
    pub fn show_results(&mut self) -> Result<(), QuizError> {
        if !self.state.completed {
            return Err(QuizError::NotComplete);
        }
        if !self.state.results_visible {
            self.state.results_visible = true;
            self.persist();
        }
        Ok(())
    }

    /// Drop the session and its snapshot and return to the first setup step.
    /// The configuration is kept.
    pub fn reset(&mut self) {
        self.persistence.clear();
        let configuration = self.state.configuration.clone();
        self.state = SessionState::new(configuration);
        self.config_step = ConfigStep::Category;
        self.insufficient = None;
        info!("quiz reset");
    }

    /// Re-render the current question for a new variant toggle value.
    ///
    /// Returns `false` when the value did not change. A selected answer
    /// follows its option slot.
    pub fn on_variant_toggle_changed(&mut self, use_alternate: bool) -> bool {
        if use_alternate == self.use_alternate {
            return false;
        }
        self.use_alternate = use_alternate;
        apply_variant(&mut self.state, use_alternate);
        debug!(use_alternate, "variant toggle applied");
        self.persist();
        true
    }

    /// Resume a fresh snapshot of a started quiz, if there is one.
    pub fn restore(&mut self) -> bool {
        self.restore_at(Utc::now())
    }

    /// Restoring does not write a snapshot back; the next write follows the
    /// next real mutation. A running quiz saved without a question gets a
    /// fresh one.
    pub fn restore_at(&mut self, now: DateTime<Utc>) -> bool {
        let Some(snapshot) = self.persistence.load_snapshot_at(now) else {
            return false;
        };
        let mut state = snapshot.into_state(&self.state.configuration);

        let availability = Availability::for_configuration(&self.vocabulary, &state.configuration);
        if !availability.is_sufficient() {
            warn!(
                found = availability.found,
                needed = availability.needed,
                "saved quiz no longer fits the vocabulary"
            );
            self.state.configuration = state.configuration;
            self.insufficient = Some(availability);
            return false;
        }

        apply_variant(&mut state, self.use_alternate);
        info!(
            question = state.question_index,
            score = state.score,
            "resuming saved quiz"
        );
        self.state = state;
        self.insufficient = None;
        if !self.state.completed && self.state.current_question.is_none() {
            self.generate_question();
        }
        true
    }

    /// Categories offered on the first setup step, `all` first.
    pub fn category_choices(&self) -> Vec<CategoryFilter> {
        std::iter::once(CategoryFilter::All)
            .chain(self.vocabulary.category_names().map(CategoryFilter::from))
            .collect()
    }

    pub fn score_line(&self) -> ScoreLine {
        ScoreLine {
            correct: self.state.correct_count(),
            answered: self.state.answered(),
        }
    }

    pub fn summary(&self) -> ResultsSummary {
        ResultsSummary::new(self.state.score, self.state.configuration.question_count)
    }

    /// "Question 3 of 10" in the given language.
    pub fn question_counter<T: Translate + ?Sized>(&self, t: &T) -> String {
        let params: [(&str, &dyn fmt::Display); 2] = [
            ("current", &self.state.question_index),
            ("total", &self.state.configuration.question_count),
        ];
        t.format(MessageKey::QuestionNumber, &params)
    }

    fn generate_question(&mut self) {
        let pool = self.vocabulary.pool(&self.state.configuration);
        let generated = QuestionGenerator::new(&pool, &self.universe)
            .with_alternate(self.use_alternate)
            .generate(&mut self.rng, &self.state.used_prompts);
        if generated.question.is_none() {
            warn!(
                question = self.state.question_index,
                used = self.state.used_prompts.len(),
                "no unused vocabulary left for a question"
            );
        }
        self.state.current_question = generated.question;
        self.state.used_prompts = generated.excluded;
    }

    fn persist(&mut self) {
        if !self.state.quiz_started {
            return;
        }
        if let Some(at) = self.persistence.save(&self.state) {
            self.state.last_persisted_at = Some(at);
        }
    }
}

fn apply_variant(state: &mut SessionState, use_alternate: bool) {
    let Some(question) = state.current_question.as_mut() else {
        return;
    };
    let slot = state
        .selected_answer
        .as_deref()
        .and_then(|answer| question.position_of(answer));
    question.recompute(use_alternate);
    if let Some(slot) = slot {
        state.selected_answer = question.options.get(slot).cloned();
    }
}
