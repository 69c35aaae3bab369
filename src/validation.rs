//! Consistency checks over a loaded vocabulary.
//!
//! Prompts identify entries inside a session, so a prompt shared between
//! categories breaks exclusion. Nothing here refuses to load data; the
//! binary logs the findings at startup and `--validate` prints them.

use std::fmt;

use itertools::Itertools;
use tracing::{debug, warn};

use crate::vocabulary::{Vocabulary, VocabularyEntry};

/// Traditional or Hong Kong-only characters that must not appear in a
/// Mainland form.
pub const DISALLOWED_IN_PRIMARY: [char; 24] = [
    '嚟', '喺', '呢', '嗰', '裏', '裡', '邊', '尋', '聽', '晝', '黃', '鐘', '涼', '瞓', '囊', '銀',
    '返', '單', '車', '踩', '揸', '阵', '陣', '光',
];

/// A value found in more than one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub value: String,
    /// Category of every occurrence, in load order.
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraditionalHit {
    pub category: String,
    pub prompt: String,
    pub characters: Vec<char>,
}

/// `has_alternate` disagrees with whether the two forms differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagMismatch {
    pub category: String,
    pub prompt: String,
    pub flagged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    pub total_entries: usize,
    pub duplicate_prompts: Vec<Duplicate>,
    pub duplicate_answers: Vec<Duplicate>,
    pub traditional_in_primary: Vec<TraditionalHit>,
    pub flag_mismatches: Vec<FlagMismatch>,
    /// Entries with a Hong Kong variant, per category.
    pub alternate_counts: Vec<(String, usize)>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.duplicate_prompts.is_empty()
            && self.duplicate_answers.is_empty()
            && self.traditional_in_primary.is_empty()
            && self.flag_mismatches.is_empty()
    }

    pub fn findings(&self) -> usize {
        self.duplicate_prompts.len()
            + self.duplicate_answers.len()
            + self.traditional_in_primary.len()
            + self.flag_mismatches.len()
    }

    /// Emit every finding as a `warn` event.
    pub fn log(&self) {
        for dup in &self.duplicate_prompts {
            warn!(prompt = %dup.value, categories = ?dup.categories, "duplicate prompt");
        }
        for dup in &self.duplicate_answers {
            warn!(answer = %dup.value, categories = ?dup.categories, "duplicate Mainland answer");
        }
        for hit in &self.traditional_in_primary {
            warn!(
                category = %hit.category,
                prompt = %hit.prompt,
                characters = ?hit.characters,
                "Hong Kong characters in Mainland form"
            );
        }
        for m in &self.flag_mismatches {
            warn!(
                category = %m.category,
                prompt = %m.prompt,
                flagged = m.flagged,
                "variant flag mismatch"
            );
        }
        debug!(
            entries = self.total_entries,
            findings = self.findings(),
            "vocabulary validated"
        );
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total vocabulary entries: {}", self.total_entries)?;

        writeln!(f, "Duplicate prompts: {}", self.duplicate_prompts.len())?;
        for dup in &self.duplicate_prompts {
            writeln!(f, "  \"{}\" in {}", dup.value, dup.categories.join(", "))?;
        }

        writeln!(f, "Duplicate Mainland answers: {}", self.duplicate_answers.len())?;
        for dup in &self.duplicate_answers {
            writeln!(f, "  {} in {}", dup.value, dup.categories.join(", "))?;
        }

        writeln!(
            f,
            "Hong Kong characters in Mainland forms: {}",
            self.traditional_in_primary.len()
        )?;
        for hit in &self.traditional_in_primary {
            let chars: String = hit.characters.iter().collect();
            writeln!(f, "  {}/{}: {}", hit.category, hit.prompt, chars)?;
        }

        writeln!(f, "Variant flag mismatches: {}", self.flag_mismatches.len())?;
        for m in &self.flag_mismatches {
            writeln!(f, "  {}/{} (flagged: {})", m.category, m.prompt, m.flagged)?;
        }

        writeln!(f, "Hong Kong variants per category:")?;
        for (category, count) in &self.alternate_counts {
            writeln!(f, "  {category}: {count}")?;
        }
        Ok(())
    }
}

pub fn validate(vocabulary: &Vocabulary) -> ValidationReport {
    let tagged: Vec<(&str, &VocabularyEntry)> = vocabulary
        .categories()
        .iter()
        .flat_map(|c| c.entries.iter().map(move |e| (c.name.as_str(), e)))
        .collect();

    let duplicate_prompts = duplicates(tagged.iter().map(|(c, e)| (*c, e.prompt.as_str())));
    let duplicate_answers =
        duplicates(tagged.iter().map(|(c, e)| (*c, e.primary_answer.as_str())));

    let traditional_in_primary = tagged
        .iter()
        .filter_map(|(category, e)| {
            let characters: Vec<char> = e
                .primary_answer
                .chars()
                .filter(|ch| DISALLOWED_IN_PRIMARY.contains(ch))
                .unique()
                .collect();
            (!characters.is_empty()).then(|| TraditionalHit {
                category: category.to_string(),
                prompt: e.prompt.clone(),
                characters,
            })
        })
        .collect();

    let flag_mismatches = tagged
        .iter()
        .filter(|(_, e)| {
            let differs =
                !e.alternate_answer.is_empty() && e.alternate_answer != e.primary_answer;
            differs != e.has_alternate
        })
        .map(|(category, e)| FlagMismatch {
            category: category.to_string(),
            prompt: e.prompt.clone(),
            flagged: e.has_alternate,
        })
        .collect();

    let alternate_counts = vocabulary
        .categories()
        .iter()
        .map(|c| {
            let count = c.entries.iter().filter(|e| e.has_alternate).count();
            (c.name.clone(), count)
        })
        .collect();

    ValidationReport {
        total_entries: tagged.len(),
        duplicate_prompts,
        duplicate_answers,
        traditional_in_primary,
        flag_mismatches,
        alternate_counts,
    }
}

fn duplicates<'a>(values: impl Iterator<Item = (&'a str, &'a str)>) -> Vec<Duplicate> {
    values
        .into_group_map_by(|(_, value)| *value)
        .into_iter()
        .filter(|(_, hits)| hits.len() > 1)
        .map(|(value, hits)| Duplicate {
            value: value.to_string(),
            categories: hits.into_iter().map(|(c, _)| c.to_string()).collect(),
        })
        .sorted_by(|a, b| a.value.cmp(&b.value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::tests::entry;
    use crate::vocabulary::Category;

    #[test]
    fn test_embedded_vocabulary_is_clean() {
        let vocab = Vocabulary::embedded().unwrap();
        let report = validate(&vocab);

        assert!(report.is_clean(), "{report}");
        assert_eq!(report.total_entries, vocab.len());
        assert!(report.alternate_counts.iter().any(|(_, n)| *n > 0));
    }

    #[test]
    fn test_detects_prompt_shared_between_categories() {
        let vocab = Vocabulary::from_categories(vec![
            Category::new("animals", vec![entry("kyckling", "鸡", 1)]),
            Category::new("food", vec![entry("kyckling", "鸡肉", 1)]),
        ]);

        let report = validate(&vocab);

        assert_eq!(
            report.duplicate_prompts,
            vec![Duplicate {
                value: "kyckling".into(),
                categories: vec!["animals".into(), "food".into()],
            }]
        );
        assert!(report.duplicate_answers.is_empty());
        assert!(!report.is_clean());
    }

    #[test]
    fn test_detects_hong_kong_characters_in_mainland_form() {
        let bad = VocabularyEntry {
            primary_answer: "喺呢度喺".into(),
            alternate_answer: "喺呢度".into(),
            has_alternate: true,
            ..entry("här", "x", 2)
        };
        let vocab = Vocabulary::from_categories(vec![Category::new("movement", vec![bad])]);

        let report = validate(&vocab);

        assert_eq!(report.traditional_in_primary.len(), 1);
        assert_eq!(report.traditional_in_primary[0].characters, vec!['喺', '呢']);
        assert_eq!(report.alternate_counts, vec![("movement".to_string(), 1)]);
    }

    #[test]
    fn test_detects_flag_mismatch() {
        let unflagged = VocabularyEntry {
            alternate_answer: "貓".into(),
            ..entry("katt", "猫", 1)
        };
        let vocab = Vocabulary::from_categories(vec![Category::new("animals", vec![unflagged])]);

        let report = validate(&vocab);

        assert_eq!(report.flag_mismatches.len(), 1);
        assert!(!report.flag_mismatches[0].flagged);
        assert_eq!(report.findings(), 1);
    }
}
