use std::io::{self, BufRead, BufReader};
use std::sync::mpsc::{self, Receiver};

use rand::Rng;
use tracing::debug;

use crate::config::{DifficultyFilter, SettingsStore};
use crate::error::QuizError;
use crate::quiz::{ConfigUpdate, Phase, QuizSession};
use crate::session::ConfigStep;
use crate::storage::KeyValueStore;
use crate::variant::VariantToggle;

/// One learner action, parsed from an input line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuizEvent {
    /// A number as typed, 1-based: an option on a question, a category on
    /// the first setup step, a question count on the second.
    Number(usize),
    Difficulty(DifficultyFilter),
    Next,
    ToggleVariant,
    ResultsOrRestart,
    Back,
    Quit,
    Unknown(String),
}

impl QuizEvent {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_lowercase().as_str() {
            "n" | "next" | "" => Self::Next,
            "h" | "hk" => Self::ToggleVariant,
            "r" | "results" | "restart" => Self::ResultsOrRestart,
            "b" | "back" => Self::Back,
            "q" | "quit" | "exit" => Self::Quit,
            "a" | "all" => Self::Difficulty(DifficultyFilter::All),
            "e" | "easy" => Self::Difficulty(DifficultyFilter::Easy),
            "m" | "medium" => Self::Difficulty(DifficultyFilter::Medium),
            "hard" => Self::Difficulty(DifficultyFilter::Hard),
            other => match other.parse::<usize>() {
                Ok(n) if n >= 1 => Self::Number(n),
                _ => Self::Unknown(trimmed.to_string()),
            },
        }
    }
}

/// Source of learner input.
pub trait QuizEventSource {
    /// Next event, or `None` once the input is exhausted.
    fn next_event(&self) -> Option<QuizEvent>;
}

/// Production event source: a reader thread parses lines from stdin and
/// forwards them over a channel.
pub struct StdinEventSource {
    rx: Receiver<QuizEvent>,
}

impl StdinEventSource {
    pub fn new() -> Self {
        Self::from_reader(BufReader::new(io::stdin()))
    }

    pub fn from_reader<B: BufRead + Send + 'static>(reader: B) -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else { break };
                if tx.send(QuizEvent::parse(&line)).is_err() {
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl Default for StdinEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizEventSource for StdinEventSource {
    fn next_event(&self) -> Option<QuizEvent> {
        self.rx.recv().ok()
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<QuizEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<QuizEvent>) -> Self {
        Self { rx }
    }
}

impl QuizEventSource for TestEventSource {
    fn next_event(&self) -> Option<QuizEvent> {
        self.rx.recv().ok()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Single owner of the session and the variant toggle. Events are applied
/// one at a time.
pub struct QuizApp<S, R> {
    pub session: QuizSession<S, R>,
    pub toggle: VariantToggle,
}

impl<S: KeyValueStore + Clone + 'static, R: Rng> QuizApp<S, R> {
    /// The toggle starts at the session's value and persists every change
    /// through `settings`.
    pub fn new(session: QuizSession<S, R>, settings: SettingsStore<S>) -> Self {
        let mut toggle = VariantToggle::new(session.use_alternate());
        toggle.subscribe(move |value| settings.save_variant(value));
        Self { session, toggle }
    }

    pub fn handle(&mut self, event: QuizEvent) -> Result<Flow, QuizError> {
        debug!(?event, phase = ?self.session.phase(), "handling event");
        let session = &mut self.session;
        match (event, session.phase()) {
            (QuizEvent::Quit, _) => return Ok(Flow::Quit),
            (QuizEvent::ToggleVariant, _) => {
                let value = self.toggle.toggle();
                session.on_variant_toggle_changed(value);
            }

            (QuizEvent::Next, Phase::Configuring(_)) => session.next_config_step()?,
            (QuizEvent::Back, Phase::Configuring(_)) => session.previous_config_step()?,
            (QuizEvent::Number(n), Phase::Configuring(ConfigStep::Category)) => {
                let index = position(n)?;
                let category = session
                    .category_choices()
                    .into_iter()
                    .nth(index)
                    .ok_or(QuizError::NoSuchOption { index })?;
                session.configure(ConfigUpdate::Category(category))?;
            }
            (QuizEvent::Number(n), Phase::Configuring(ConfigStep::DifficultyAndCount)) => {
                session.configure(ConfigUpdate::QuestionCount(n))?;
            }
            (QuizEvent::Difficulty(d), Phase::Configuring(ConfigStep::DifficultyAndCount)) => {
                session.configure(ConfigUpdate::Difficulty(d))?;
            }
            (QuizEvent::Next | QuizEvent::Back, Phase::InsufficientVocabulary { .. }) => {
                session.back_to_setup()
            }

            (QuizEvent::Number(n), Phase::InProgress | Phase::AnswerRevealed) => {
                session.select_option(position(n)?)?;
            }
            (QuizEvent::Next, Phase::InProgress | Phase::AnswerRevealed) => session.advance()?,

            (QuizEvent::ResultsOrRestart, Phase::Completed) => session.show_results()?,
            (
                QuizEvent::ResultsOrRestart | QuizEvent::Back,
                Phase::DetailedResults | Phase::Stalled,
            ) => session.reset(),
            (QuizEvent::ResultsOrRestart, Phase::InProgress | Phase::AnswerRevealed) => {
                session.reset()
            }

            (event, phase) => debug!(?event, ?phase, "event ignored"),
        }
        Ok(Flow::Continue)
    }

    /// Drain `source`, calling `after_each` with the outcome of every event.
    /// Stops on quit or when the input ends.
    pub fn run<E, F>(&mut self, source: &E, mut after_each: F)
    where
        E: QuizEventSource,
        F: FnMut(&Self, Result<Flow, QuizError>),
    {
        while let Some(event) = source.next_event() {
            let outcome = self.handle(event);
            let quit = matches!(outcome, Ok(Flow::Quit));
            after_each(self, outcome);
            if quit {
                break;
            }
        }
    }
}

/// Map a typed 1-based number onto a 0-based position.
fn position(number: usize) -> Result<usize, QuizError> {
    number
        .checked_sub(1)
        .ok_or(QuizError::NoSuchOption { index: number })
}
