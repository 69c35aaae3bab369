//! Plain-text screens for the terminal front end.
//!
//! Every function returns a string so screens can be asserted on in tests;
//! the binary only prints them.

use std::fmt::{self, Write};

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::config::QUESTION_COUNT_OPTIONS;
use crate::i18n::{MessageKey, Translate};
use crate::quiz::{Phase, QuizSession};
use crate::session::{ConfigStep, QuizResult};
use crate::storage::KeyValueStore;
use crate::variant::{display_pronunciation, display_text};
use crate::vocabulary::VocabularyEntry;

const RULE: &str = "----------------------------------------";

/// Render the screen for the session's current phase.
pub fn render<S, R, T>(session: &QuizSession<S, R>, t: &T) -> String
where
    S: KeyValueStore + Clone,
    R: Rng,
    T: Translate + ?Sized,
{
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = render_into(&mut out, session, t);
    out
}

fn render_into<S, R, T>(out: &mut String, session: &QuizSession<S, R>, t: &T) -> fmt::Result
where
    S: KeyValueStore + Clone,
    R: Rng,
    T: Translate + ?Sized,
{
    match session.phase() {
        Phase::Configuring(step) => render_setup(out, session, step, t),
        Phase::InsufficientVocabulary { found, needed } => {
            let params: [(&str, &dyn fmt::Display); 2] = [("found", &found), ("needed", &needed)];
            writeln!(out, "{}", t.format(MessageKey::NotEnoughWords, &params))?;
            writeln!(out, "[b] {}", t.lookup(MessageKey::BackToSetup))
        }
        Phase::InProgress | Phase::AnswerRevealed => render_question(out, session, t),
        Phase::Stalled => {
            writeln!(out, "{}", t.lookup(MessageKey::Loading))?;
            writeln!(out, "{}", t.lookup(MessageKey::NotEnoughFiltered))?;
            writeln!(out, "[b] {}", t.lookup(MessageKey::BackToSetup))
        }
        Phase::Completed => {
            let summary = session.summary();
            let params: [(&str, &dyn fmt::Display); 2] =
                [("score", &summary.correct), ("total", &summary.total)];
            writeln!(out, "{}", t.lookup(MessageKey::CompleteTitle))?;
            writeln!(out, "{}", t.format(MessageKey::CompleteScore, &params))?;
            writeln!(out, "{}", t.lookup(summary.score_message()))?;
            writeln!(out, "[r] {}", t.lookup(MessageKey::ViewResults))
        }
        Phase::DetailedResults => render_results(out, session, t),
    }
}

fn render_setup<S, R, T>(
    out: &mut String,
    session: &QuizSession<S, R>,
    step: ConfigStep,
    t: &T,
) -> fmt::Result
where
    S: KeyValueStore + Clone,
    R: Rng,
    T: Translate + ?Sized,
{
    let cfg = session.configuration();
    writeln!(out, "{} ({}/2)", t.lookup(MessageKey::SetupTitle), step.number())?;
    writeln!(out, "{RULE}")?;
    match step {
        ConfigStep::Category => {
            writeln!(out, "{}:", t.lookup(MessageKey::SetupCategory))?;
            for (i, choice) in session.category_choices().iter().enumerate() {
                let marker = if *choice == cfg.category { '>' } else { ' ' };
                writeln!(out, "{marker} {}. {choice}", i + 1)?;
            }
        }
        ConfigStep::DifficultyAndCount => {
            writeln!(out, "{}", t.lookup(MessageKey::SetupDifficultyAndCount))?;
            writeln!(out, "  {} / {}", cfg.difficulty, cfg.question_count)?;
            let counts: Vec<String> =
                QUESTION_COUNT_OPTIONS.iter().map(|n| n.to_string()).collect();
            writeln!(out, "  [all/easy/medium/hard] [{}]", counts.join("/"))?;
            let availability = session.availability();
            writeln!(out, "  {}/{}", availability.found, availability.needed)?;
        }
    }
    let next = match step.next() {
        Some(_) => MessageKey::SetupNext,
        None => MessageKey::StartQuiz,
    };
    if step.previous().is_some() {
        let back = t.lookup(MessageKey::SetupBack);
        writeln!(out, "[n] {}  [b] {back}", t.lookup(next))
    } else {
        writeln!(out, "[n] {}", t.lookup(next))
    }
}

fn render_question<S, R, T>(out: &mut String, session: &QuizSession<S, R>, t: &T) -> fmt::Result
where
    S: KeyValueStore + Clone,
    R: Rng,
    T: Translate + ?Sized,
{
    let Some(question) = session.current_question() else {
        return writeln!(out, "{}", t.lookup(MessageKey::Loading));
    };
    let state = session.state();

    writeln!(
        out,
        "{}    {}: {}",
        session.question_counter(t),
        t.lookup(MessageKey::Score),
        session.score_line()
    )?;
    writeln!(out, "{RULE}")?;
    let params: [(&str, &dyn fmt::Display); 1] = [("word", &question.prompt)];
    writeln!(out, "{}", t.format(MessageKey::Question, &params))?;
    writeln!(out)?;

    for (i, option) in question.options.iter().enumerate() {
        let marker = match state.selected_answer.as_deref() {
            Some(selected) if selected == option => '>',
            _ => ' ',
        };
        if state.answer_revealed {
            let pronunciation = question
                .option_pronunciations
                .get(i)
                .map(String::as_str)
                .unwrap_or_default();
            writeln!(out, "{marker} {}. {option}  ({pronunciation})", i + 1)?;
        } else {
            writeln!(out, "{marker} {}. {option}", i + 1)?;
        }
    }

    if state.answer_revealed {
        writeln!(out)?;
        let correct = state.results.last().is_some_and(|r| r.is_correct);
        if correct {
            writeln!(out, "{}", t.lookup(MessageKey::Correct))?;
        } else {
            let params: [(&str, &dyn fmt::Display); 1] = [("answer", &question.correct_answer)];
            writeln!(out, "{}", t.format(MessageKey::Incorrect, &params))?;
        }
        let last = state.question_index >= state.configuration.question_count;
        let next = if last {
            MessageKey::ViewResults
        } else {
            MessageKey::NextQuestion
        };
        writeln!(out, "[n] {}", t.lookup(next))?;
    } else {
        writeln!(out, "[1-{}] [h] HK", question.options.len())?;
    }
    Ok(())
}

fn render_results<S, R, T>(out: &mut String, session: &QuizSession<S, R>, t: &T) -> fmt::Result
where
    S: KeyValueStore + Clone,
    R: Rng,
    T: Translate + ?Sized,
{
    let summary = session.summary();
    writeln!(out, "{}", t.lookup(MessageKey::ResultsTitle))?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "{}", summary.describe(t))?;
    writeln!(out, "{}", t.lookup(summary.score_message()))?;
    writeln!(out)?;
    for (i, result) in session.results().iter().enumerate() {
        write_result(out, i + 1, result, t)?;
    }
    writeln!(out, "[r] {}", t.lookup(MessageKey::RestartButton))
}

fn write_result<T: Translate + ?Sized>(
    out: &mut String,
    number: usize,
    result: &QuizResult,
    t: &T,
) -> fmt::Result {
    let mark = if result.is_correct { "✅" } else { "❌" };
    writeln!(out, "{number:>2}. {mark} {}", result.prompt)?;
    writeln!(
        out,
        "    {}: {} ({})",
        t.lookup(MessageKey::YourAnswer),
        result.user_answer,
        result.user_pronunciation
    )?;
    if !result.is_correct {
        writeln!(
            out,
            "    {}: {} ({})",
            t.lookup(MessageKey::CorrectAnswer),
            result.correct_answer,
            result.correct_pronunciation
        )?;
    }
    Ok(())
}

/// One line per entry for `--list`.
pub fn render_listing(hits: &[(&str, &VocabularyEntry)], use_alternate: bool) -> String {
    hits.iter()
        .map(|(category, e)| {
            format!(
                "{:<12} {:<20} {} ({}) [{}]\n",
                category,
                e.prompt,
                display_text(e, use_alternate),
                display_pronunciation(e, use_alternate),
                e.difficulty_tier
            )
        })
        .collect()
}

/// Rough age such as "5 minutes" for the resume notice.
pub fn saved_ago(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now - at;
    let (value, unit) = if age.num_hours() > 0 {
        (age.num_hours(), "hour")
    } else if age.num_minutes() > 0 {
        (age.num_minutes(), "minute")
    } else {
        (age.num_seconds().max(0), "second")
    };
    if value == 1 {
        format!("1 {unit}")
    } else {
        format!("{value} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::{Catalog, Locale};
    use crate::quiz::ConfigUpdate;
    use crate::storage::MemoryStore;
    use crate::vocabulary::tests::entry;
    use crate::vocabulary::{Category, Vocabulary};
    use chrono::Duration;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn session(n: usize) -> QuizSession<MemoryStore, StdRng> {
        let entries = (0..n)
            .map(|i| entry(&format!("ord{i}"), &format!("字{i}"), 1))
            .collect();
        let vocab = Vocabulary::from_categories(vec![Category::new("animals", entries)]);
        let mut session =
            QuizSession::with_rng(vocab, MemoryStore::default(), false, StdRng::seed_from_u64(2));
        session.configure(ConfigUpdate::QuestionCount(3)).unwrap();
        session
    }

    #[test]
    fn test_setup_screen_lists_categories() {
        let screen = render(&session(4), &Catalog::new(Locale::En));
        assert!(screen.contains("Configure Quiz (1/2)"));
        assert!(screen.contains("> 1. all"));
        assert!(screen.contains("  2. animals"));
        assert!(screen.contains("[n] Next"));
        assert!(!screen.contains("Next Question"));
    }

    #[test]
    fn test_second_setup_step_offers_start() {
        let mut quiz = session(4);
        quiz.next_config_step().unwrap();

        let screen = render(&quiz, &Catalog::new(Locale::Sv));

        assert!(screen.contains("Konfigurera Quiz (2/2)"));
        assert!(screen.contains("[n] Starta quiz  [b] Tillbaka"));
        assert!(screen.contains("[all/easy/medium/hard] [5/8/10/12/15/20]"));
    }

    #[test]
    fn test_question_screen_shows_counter_and_score() {
        let mut quiz = session(4);
        quiz.start().unwrap();

        let screen = render(&quiz, &Catalog::new(Locale::En));

        assert!(screen.contains("Question 1 of 3"));
        assert!(screen.contains("Score: 0/0"));
        assert!(screen.contains("1. "));
        assert!(screen.contains("3. "));
    }

    #[test]
    fn test_revealed_answer_shows_feedback() {
        let mut quiz = session(4);
        quiz.start().unwrap();
        let correct = quiz.current_question().unwrap().correct_answer.clone();
        quiz.select_answer(&correct).unwrap();

        let screen = render(&quiz, &Catalog::new(Locale::Sv));

        assert!(screen.contains("✅ Rätt!"));
        assert!(screen.contains("Nästa fråga"));
    }

    #[test]
    fn test_results_screen_lists_every_answer() {
        let mut quiz = session(4);
        quiz.start().unwrap();
        for _ in 0..3 {
            quiz.select_option(0).unwrap();
            quiz.advance().unwrap();
        }

        let screen = render(&quiz, &Catalog::new(Locale::En));

        assert!(screen.contains("Detailed Results"));
        assert!(screen.contains("out of 3 questions"));
        assert_eq!(screen.matches("Your Answer").count(), 3);
    }

    #[test]
    fn test_insufficient_screen_shows_counts() {
        let mut quiz = session(2);
        let _ = quiz.start();

        let screen = render(&quiz, &Catalog::new(Locale::En));

        assert!(screen.contains("Found 2 words but need 3"));
    }

    #[test]
    fn test_saved_ago_units() {
        let now = Utc::now();
        assert_eq!(saved_ago(now - Duration::seconds(30), now), "30 seconds");
        assert_eq!(saved_ago(now - Duration::minutes(1), now), "1 minute");
        assert_eq!(saved_ago(now - Duration::hours(5), now), "5 hours");
    }
}
