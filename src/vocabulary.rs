use std::fmt;
use std::fs;
use std::path::Path;

use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{CategoryFilter, QuizConfiguration};
use crate::error::VocabularyError;

static DATA_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/data");

/// Categories shipped with the binary, in display order.
pub const CATEGORIES: [&str; 8] = [
    "animals",
    "food",
    "family",
    "actions",
    "items",
    "fun-play",
    "time",
    "movement-directions",
];

/// How hard a word is, 1 (basic) to 3 (advanced).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DifficultyTier {
    Basic = 1,
    Intermediate = 2,
    Advanced = 3,
}

impl TryFrom<u8> for DifficultyTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Basic),
            2 => Ok(Self::Intermediate),
            3 => Ok(Self::Advanced),
            other => Err(format!("difficulty must be 1, 2 or 3, got {other}")),
        }
    }
}

impl From<DifficultyTier> for u8 {
    fn from(tier: DifficultyTier) -> Self {
        tier as u8
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// One word with its Mainland (primary) and Hong Kong (alternate) forms.
///
/// `prompt` is the identity key used for exclusion and deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VocabularyEntry {
    #[serde(rename = "swedish")]
    pub prompt: String,
    #[serde(rename = "mainland_cantonese")]
    pub primary_answer: String,
    #[serde(rename = "hongkong_cantonese", default)]
    pub alternate_answer: String,
    #[serde(rename = "jyutping", default)]
    pub pronunciation: String,
    #[serde(
        rename = "hongkong_jyutping",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub alternate_pronunciation: Option<String>,
    #[serde(rename = "difficulty")]
    pub difficulty_tier: DifficultyTier,
    #[serde(rename = "has_hk_variant", default)]
    pub has_alternate: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub entries: Vec<VocabularyEntry>,
}

impl Category {
    pub fn new(name: impl Into<String>, entries: Vec<VocabularyEntry>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }
}

/// Read-only word lists grouped by category.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Vocabulary {
    categories: Vec<Category>,
}

impl Vocabulary {
    pub fn from_categories(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Load the data set compiled into the binary.
    pub fn embedded() -> Result<Self, VocabularyError> {
        let categories = CATEGORIES
            .iter()
            .map(|name| read_embedded_category(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { categories })
    }

    /// Load every `*.json` file in `dir`; the file stem names the category.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, VocabularyError> {
        let dir = dir.as_ref();
        let read_dir = fs::read_dir(dir).map_err(|source| VocabularyError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|source| VocabularyError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(VocabularyError::Empty(dir.to_path_buf()));
        }

        let mut categories = Vec::with_capacity(paths.len());
        for path in paths {
            let contents = fs::read_to_string(&path).map_err(|source| VocabularyError::Io {
                path: path.clone(),
                source,
            })?;
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let entries = parse_entries(&name, &contents)?;
            debug!(category = %name, entries = entries.len(), "loaded vocabulary file");
            categories.push(Category::new(name, entries));
        }

        Ok(Self { categories })
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.categories.iter().map(|c| c.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every entry across all categories, unfiltered.
    pub fn universe(&self) -> Vec<VocabularyEntry> {
        self.categories
            .iter()
            .flat_map(|c| c.entries.iter().cloned())
            .collect()
    }

    /// Entries matching the configuration's category and difficulty filters.
    ///
    /// An unknown category name falls back to every category.
    pub fn pool(&self, config: &QuizConfiguration) -> Vec<VocabularyEntry> {
        let selected: Vec<&Category> = match &config.category {
            CategoryFilter::Named(name) => {
                let matching: Vec<&Category> = self
                    .categories
                    .iter()
                    .filter(|c| &c.name == name)
                    .collect();
                if matching.is_empty() {
                    self.categories.iter().collect()
                } else {
                    matching
                }
            }
            CategoryFilter::All => self.categories.iter().collect(),
        };

        selected
            .into_iter()
            .flat_map(|c| c.entries.iter())
            .filter(|e| config.difficulty.admits(e.difficulty_tier))
            .cloned()
            .collect()
    }

    /// Entries in `category` whose prompt, either answer form or pronunciation
    /// contains `term`, sorted by prompt. Prompt and pronunciation match
    /// case-insensitively.
    pub fn search(&self, category: &CategoryFilter, term: &str) -> Vec<(&str, &VocabularyEntry)> {
        let needle = term.to_lowercase();
        let mut hits: Vec<(&str, &VocabularyEntry)> = self
            .categories
            .iter()
            .filter(|c| match category {
                CategoryFilter::All => true,
                CategoryFilter::Named(name) => &c.name == name,
            })
            .flat_map(|c| c.entries.iter().map(move |e| (c.name.as_str(), e)))
            .filter(|(_, e)| {
                term.is_empty()
                    || e.prompt.to_lowercase().contains(&needle)
                    || e.primary_answer.contains(term)
                    || e.alternate_answer.contains(term)
                    || e.pronunciation.to_lowercase().contains(&needle)
            })
            .collect();
        hits.sort_by(|a, b| a.1.prompt.cmp(&b.1.prompt));
        hits
    }
}

fn read_embedded_category(name: &str) -> Result<Category, VocabularyError> {
    let file_name = format!("{name}.json");
    let file = DATA_DIR
        .get_file(&file_name)
        .ok_or_else(|| VocabularyError::MissingFile(file_name.clone()))?;
    let contents = String::from_utf8_lossy(file.contents());
    let entries = parse_entries(&file_name, &contents)?;
    Ok(Category::new(name, entries))
}

fn parse_entries(file: &str, contents: &str) -> Result<Vec<VocabularyEntry>, VocabularyError> {
    serde_json::from_str(contents).map_err(|source| VocabularyError::Malformed {
        file: file.to_string(),
        source,
    })
}
