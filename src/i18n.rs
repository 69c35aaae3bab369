//! Localized strings for the quiz texts and the `{name}` placeholder helper.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Locale {
    #[default]
    Sv,
    En,
}

/// Symbolic keys for every string the quiz formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    SetupTitle,
    SetupCategory,
    SetupDifficultyAndCount,
    SetupNext,
    SetupBack,
    StartQuiz,
    Question,
    QuestionNumber,
    Score,
    Correct,
    Incorrect,
    NextQuestion,
    ViewResults,
    CompleteTitle,
    CompleteScore,
    Excellent,
    Good,
    KeepPracticing,
    TryAgain,
    RestartButton,
    ResultsTitle,
    ResultsSummary,
    YourAnswer,
    CorrectAnswer,
    Loading,
    NotEnoughWords,
    NotEnoughFiltered,
    BackToSetup,
    Resuming,
}

/// Key to string lookup. The quiz core only reads through this trait.
pub trait Translate {
    fn lookup(&self, key: MessageKey) -> &str;

    fn format(&self, key: MessageKey, params: &[(&str, &dyn Display)]) -> String {
        substitute(self.lookup(key), params)
    }
}

/// Replace every `{name}` in `template` with the matching parameter.
/// Unknown placeholders are left as they are.
pub fn substitute(template: &str, params: &[(&str, &dyn Display)]) -> String {
    params
        .iter()
        .fold(template.to_string(), |text, (name, value)| {
            text.replace(&format!("{{{name}}}"), &value.to_string())
        })
}

/// Built-in Swedish and English tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct Catalog {
    locale: Locale,
}

impl Catalog {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }
}

impl Translate for Catalog {
    fn lookup(&self, key: MessageKey) -> &str {
        match self.locale {
            Locale::Sv => swedish(key),
            Locale::En => english(key),
        }
    }
}

fn english(key: MessageKey) -> &'static str {
    use MessageKey as K;
    match key {
        K::SetupTitle => "Configure Quiz",
        K::SetupCategory => "Choose category",
        K::SetupDifficultyAndCount => "Choose difficulty and number of questions",
        K::SetupNext => "Next",
        K::SetupBack => "Back",
        K::StartQuiz => "Start Quiz",
        K::Question => "What is \"{word}\" in Cantonese?",
        K::QuestionNumber => "Question {current} of {total}",
        K::Score => "Score",
        K::Correct => "✅ Correct!",
        K::Incorrect => "❌ Incorrect. The answer is: {answer}",
        K::NextQuestion => "Next Question",
        K::ViewResults => "View Results",
        K::CompleteTitle => "Quiz Complete! 🎉",
        K::CompleteScore => "Your Score: {score}/{total}",
        K::Excellent => "Excellent work!",
        K::Good => "Good job!",
        K::KeepPracticing => "Keep practicing!",
        K::TryAgain => "Don't give up, try again!",
        K::RestartButton => "Start New Quiz",
        K::ResultsTitle => "Detailed Results",
        K::ResultsSummary => {
            "You answered {correct} out of {total} questions correctly ({percentage}%)"
        }
        K::YourAnswer => "Your Answer",
        K::CorrectAnswer => "Correct Answer",
        K::Loading => "Loading question...",
        K::NotEnoughWords => {
            "Not enough unique words available. Found {found} words but need {needed}. Please select fewer questions or change your filters."
        }
        K::NotEnoughFiltered => {
            "Not enough vocabulary items match your selected filters. Please try different settings."
        }
        K::BackToSetup => "Back to Setup",
        K::Resuming => "Resuming the quiz you saved {ago} ago.",
    }
}

fn swedish(key: MessageKey) -> &'static str {
    use MessageKey as K;
    match key {
        K::SetupTitle => "Konfigurera Quiz",
        K::SetupCategory => "Välj kategori",
        K::SetupDifficultyAndCount => "Välj svårighetsgrad och antal frågor",
        K::SetupNext => "Nästa",
        K::SetupBack => "Tillbaka",
        K::StartQuiz => "Starta quiz",
        K::Question => "Vad är \"{word}\" på kantonesiska?",
        K::QuestionNumber => "Fråga {current} av {total}",
        K::Score => "Poäng",
        K::Correct => "✅ Rätt!",
        K::Incorrect => "❌ Fel. Rätt svar är: {answer}",
        K::NextQuestion => "Nästa fråga",
        K::ViewResults => "Visa resultat",
        K::CompleteTitle => "Quiz slutfört! 🎉",
        K::CompleteScore => "Din poäng: {score}/{total}",
        K::Excellent => "Utmärkt arbete!",
        K::Good => "Bra jobbat!",
        K::KeepPracticing => "Fortsätt öva!",
        K::TryAgain => "Ge inte upp, försök igen!",
        K::RestartButton => "Starta nytt quiz",
        K::ResultsTitle => "Detaljerade resultat",
        K::ResultsSummary => "Du svarade rätt på {correct} av {total} frågor ({percentage}%)",
        K::YourAnswer => "Ditt svar",
        K::CorrectAnswer => "Rätt svar",
        K::Loading => "Laddar fråga...",
        K::NotEnoughWords => {
            "Inte tillräckligt många unika ord. Hittade {found} ord men behöver {needed}. Välj färre frågor eller ändra dina filter."
        }
        K::NotEnoughFiltered => {
            "För få ord matchar dina filter. Prova andra inställningar."
        }
        K::BackToSetup => "Tillbaka till inställningar",
        K::Resuming => "Fortsätter quizet som sparades för {ago} sedan.",
    }
}
