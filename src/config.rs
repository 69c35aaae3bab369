use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::storage::KeyValueStore;
use crate::vocabulary::DifficultyTier;

pub const CATEGORY_KEY: &str = "cantonese-quiz-category";
pub const DIFFICULTY_KEY: &str = "cantonese-quiz-difficulty";
pub const QUESTION_COUNT_KEY: &str = "cantonese-quiz-questionCount";
pub const VARIANT_KEY: &str = "cantonese-quiz-useHK";

pub const QUESTION_COUNT_OPTIONS: [usize; 6] = [5, 8, 10, 12, 15, 20];
pub const DEFAULT_QUESTION_COUNT: usize = 10;

/// Category filter; `"all"` or a category name when serialized.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CategoryFilter {
    #[default]
    All,
    Named(String),
}

impl From<String> for CategoryFilter {
    fn from(s: String) -> Self {
        if s.is_empty() || s == "all" {
            Self::All
        } else {
            Self::Named(s)
        }
    }
}

impl From<&str> for CategoryFilter {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<CategoryFilter> for String {
    fn from(c: CategoryFilter) -> Self {
        c.to_string()
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

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
pub enum DifficultyFilter {
    #[default]
    All,
    Easy,
    Medium,
    Hard,
}

impl DifficultyFilter {
    pub fn tier(self) -> Option<DifficultyTier> {
        match self {
            Self::All => None,
            Self::Easy => Some(DifficultyTier::Basic),
            Self::Medium => Some(DifficultyTier::Intermediate),
            Self::Hard => Some(DifficultyTier::Advanced),
        }
    }

    pub fn admits(self, tier: DifficultyTier) -> bool {
        self.tier().map_or(true, |t| t == tier)
    }
}

/// Filters the learner picks before a quiz starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizConfiguration {
    pub category: CategoryFilter,
    pub difficulty: DifficultyFilter,
    pub question_count: usize,
}

impl Default for QuizConfiguration {
    fn default() -> Self {
        Self {
            category: CategoryFilter::All,
            difficulty: DifficultyFilter::All,
            question_count: DEFAULT_QUESTION_COUNT,
        }
    }
}

/// Per-field settings persisted under their own keys, independent of the
/// session snapshot. Reads fall back to defaults; writes are best-effort.
#[derive(Debug, Clone)]
pub struct SettingsStore<S> {
    store: S,
}

impl<S: KeyValueStore> SettingsStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn load_configuration(&self) -> QuizConfiguration {
        let defaults = QuizConfiguration::default();
        QuizConfiguration {
            category: self.read(CATEGORY_KEY).unwrap_or(defaults.category),
            difficulty: self.read(DIFFICULTY_KEY).unwrap_or(defaults.difficulty),
            question_count: self
                .read::<usize>(QUESTION_COUNT_KEY)
                .filter(|n| *n > 0)
                .unwrap_or(defaults.question_count),
        }
    }

    pub fn save_configuration(&self, cfg: &QuizConfiguration) {
        self.write(CATEGORY_KEY, &cfg.category);
        self.write(DIFFICULTY_KEY, &cfg.difficulty);
        self.write(QUESTION_COUNT_KEY, &cfg.question_count);
    }

    pub fn load_variant(&self) -> bool {
        self.read(VARIANT_KEY).unwrap_or(false)
    }

    pub fn save_variant(&self, use_alternate: bool) {
        self.write(VARIANT_KEY, &use_alternate);
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(err) => {
                    debug!(key, %err, "ignoring malformed setting");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(key, %err, "unable to read setting");
                None
            }
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(StorageError::from)
            .and_then(|raw| self.store.set(key, &raw));
        if let Err(err) = result {
            warn!(key, %err, "unable to persist setting");
        }
    }
}
