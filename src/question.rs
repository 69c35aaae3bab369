use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::variant::{display_pronunciation, display_text, is_alternate_displayed};
use crate::vocabulary::VocabularyEntry;

/// Options per question: the correct answer plus two distractors.
pub const OPTION_COUNT: usize = 3;

/// Smallest pool a question can be generated from.
pub const MIN_POOL_SIZE: usize = OPTION_COUNT;

/// A multiple-choice question.
///
/// Every `option*` vector is parallel to `source_entries`, so slot `i`
/// always describes the same underlying entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub prompt: String,
    pub correct_answer: String,
    pub correct_pronunciation: String,
    pub correct_is_alternate: bool,
    pub correct_has_alternate: bool,
    pub options: Vec<String>,
    pub option_pronunciations: Vec<String>,
    pub option_is_alternate: Vec<bool>,
    pub option_has_alternate: Vec<bool>,
    pub source_entries: Vec<VocabularyEntry>,
}

impl QuizQuestion {
    /// Build a question from already ordered entries; `prompt` names the correct one.
    pub fn from_entries(
        prompt: impl Into<String>,
        source_entries: Vec<VocabularyEntry>,
        use_alternate: bool,
    ) -> Self {
        let mut question = Self {
            prompt: prompt.into(),
            correct_answer: String::new(),
            correct_pronunciation: String::new(),
            correct_is_alternate: false,
            correct_has_alternate: false,
            options: Vec::new(),
            option_pronunciations: Vec::new(),
            option_is_alternate: Vec::new(),
            option_has_alternate: Vec::new(),
            source_entries,
        };
        question.recompute(use_alternate);
        question
    }

    /// Refresh every displayed field from `source_entries` for a new toggle
    /// value. The option order is kept as is.
    pub fn recompute(&mut self, use_alternate: bool) {
        let entries = &self.source_entries;
        self.options = entries
            .iter()
            .map(|e| display_text(e, use_alternate).to_string())
            .collect();
        self.option_pronunciations = entries
            .iter()
            .map(|e| display_pronunciation(e, use_alternate).to_string())
            .collect();
        self.option_is_alternate = entries
            .iter()
            .map(|e| is_alternate_displayed(e, use_alternate))
            .collect();
        self.option_has_alternate = entries.iter().map(|e| e.has_alternate).collect();

        if let Some(correct) = entries.iter().find(|e| e.prompt == self.prompt) {
            self.correct_answer = display_text(correct, use_alternate).to_string();
            self.correct_pronunciation = display_pronunciation(correct, use_alternate).to_string();
            self.correct_is_alternate = is_alternate_displayed(correct, use_alternate);
            self.correct_has_alternate = correct.has_alternate;
        }
    }

    pub fn correct_entry(&self) -> Option<&VocabularyEntry> {
        self.source_entries.iter().find(|e| e.prompt == self.prompt)
    }

    /// Slot currently showing `answer`.
    pub fn position_of(&self, answer: &str) -> Option<usize> {
        self.options.iter().position(|o| o == answer)
    }

    pub fn correct_position(&self) -> Option<usize> {
        self.source_entries.iter().position(|e| e.prompt == self.prompt)
    }
}

/// Outcome of a generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generated {
    /// `None` when the pool is too small or every prompt has been used.
    pub question: Option<QuizQuestion>,
    /// The exclusion set including the new prompt, or the input unchanged.
    pub excluded: HashSet<String>,
}

/// Builds questions from a filtered pool, padding distractors from the
/// unfiltered universe when the pool runs short.
#[derive(Debug, Clone, Copy)]
pub struct QuestionGenerator<'a> {
    pool: &'a [VocabularyEntry],
    universe: &'a [VocabularyEntry],
    use_alternate: bool,
}

impl<'a> QuestionGenerator<'a> {
    pub fn new(pool: &'a [VocabularyEntry], universe: &'a [VocabularyEntry]) -> Self {
        Self {
            pool,
            universe,
            use_alternate: false,
        }
    }

    pub fn with_alternate(mut self, use_alternate: bool) -> Self {
        self.use_alternate = use_alternate;
        self
    }

    /// Pick an unused prompt and two distractors.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R, excluded: &HashSet<String>) -> Generated {
        let unchanged = || Generated {
            question: None,
            excluded: excluded.clone(),
        };

        if self.pool.len() < MIN_POOL_SIZE {
            debug!(pool = self.pool.len(), "pool too small for a question");
            return unchanged();
        }

        let available: Vec<&VocabularyEntry> = self
            .pool
            .iter()
            .filter(|e| !excluded.contains(&e.prompt))
            .collect();

        let Some(&correct) = available.choose(rng) else {
            debug!(excluded = excluded.len(), "no unused prompts left");
            return unchanged();
        };

        let mut updated = excluded.clone();
        updated.insert(correct.prompt.clone());

        let mut chosen: Vec<&VocabularyEntry> = vec![correct];
        self.pick_distractors(rng, self.pool, &mut chosen);
        if chosen.len() < OPTION_COUNT {
            debug!(
                pool = self.pool.len(),
                "padding distractors from the full vocabulary"
            );
            self.pick_distractors(rng, self.universe, &mut chosen);
        }

        let mut order: Vec<usize> = (0..chosen.len()).collect();
        order.shuffle(rng);
        let source_entries: Vec<VocabularyEntry> =
            order.iter().map(|&i| chosen[i].clone()).collect();

        let question =
            QuizQuestion::from_entries(correct.prompt.clone(), source_entries, self.use_alternate);

        Generated {
            question: Some(question),
            excluded: updated,
        }
    }

    /// Append shuffled candidates from `source` until `chosen` is full.
    /// Candidates sharing a prompt with a chosen entry, or a displayed text
    /// under either toggle value, are skipped.
    fn pick_distractors<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        source: &'a [VocabularyEntry],
        chosen: &mut Vec<&'a VocabularyEntry>,
    ) {
        let mut candidates: Vec<&VocabularyEntry> = source.iter().collect();
        candidates.shuffle(rng);

        for candidate in candidates {
            if chosen.len() >= OPTION_COUNT {
                break;
            }
            let clashes = chosen.iter().any(|c| {
                c.prompt == candidate.prompt
                    || [false, true]
                        .into_iter()
                        .any(|alt| display_text(c, alt) == display_text(candidate, alt))
            });
            if !clashes {
                chosen.push(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::DifficultyTier;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn entry(prompt: &str, primary: &str, alternate: Option<&str>) -> VocabularyEntry {
        VocabularyEntry {
            prompt: prompt.to_string(),
            primary_answer: primary.to_string(),
            alternate_answer: alternate.unwrap_or(primary).to_string(),
            pronunciation: format!("{prompt}-jp"),
            alternate_pronunciation: alternate.map(|_| format!("{prompt}-hk")),
            difficulty_tier: DifficultyTier::Basic,
            has_alternate: alternate.is_some(),
        }
    }

    fn animals() -> Vec<VocabularyEntry> {
        vec![
            entry("hund", "狗", None),
            entry("katt", "猫", Some("貓")),
            entry("fisk", "鱼", Some("魚")),
            entry("häst", "马", Some("馬")),
            entry("ko", "牛", None),
        ]
    }

    fn no_exclusions() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn test_generates_three_distinct_options() {
        let pool = animals();
        let mut rng = StdRng::seed_from_u64(7);

        let generated = QuestionGenerator::new(&pool, &pool).generate(&mut rng, &no_exclusions());
        let q = generated.question.unwrap();

        assert_eq!(q.options.len(), OPTION_COUNT);
        let unique: HashSet<&String> = q.options.iter().collect();
        assert_eq!(unique.len(), OPTION_COUNT);
        assert!(q.options.contains(&q.correct_answer));
        assert_eq!(generated.excluded, HashSet::from([q.prompt.clone()]));
    }

    #[test]
    fn test_parallel_arrays_describe_the_same_entry() {
        let pool = animals();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..20 {
            let q = QuestionGenerator::new(&pool, &pool)
                .with_alternate(true)
                .generate(&mut rng, &no_exclusions())
                .question
                .unwrap();

            for (i, e) in q.source_entries.iter().enumerate() {
                assert_eq!(q.options[i], display_text(e, true));
                assert_eq!(q.option_pronunciations[i], display_pronunciation(e, true));
                assert_eq!(q.option_is_alternate[i], is_alternate_displayed(e, true));
                assert_eq!(q.option_has_alternate[i], e.has_alternate);
            }
            let slot = q.correct_position().unwrap();
            assert_eq!(q.options[slot], q.correct_answer);
        }
    }

    #[test]
    fn test_options_stay_distinct_after_a_toggle() {
        // "sked" shows 鸡 in Mainland form and "kyckling" shows 鸡 in Hong Kong form.
        let pool = vec![
            entry("sked", "鸡", Some("匙")),
            entry("kyckling", "鸭", Some("鸡")),
            entry("hund", "狗", None),
            entry("ko", "牛", None),
        ];
        let mut rng = StdRng::seed_from_u64(5);

        for _ in 0..30 {
            let mut q = QuestionGenerator::new(&pool, &pool)
                .generate(&mut rng, &no_exclusions())
                .question
                .unwrap();
            let prompts: HashSet<&str> =
                q.source_entries.iter().map(|e| e.prompt.as_str()).collect();
            assert!(!(prompts.contains("sked") && prompts.contains("kyckling")));

            for use_alternate in [true, false] {
                q.recompute(use_alternate);
                let unique: HashSet<&String> = q.options.iter().collect();
                assert_eq!(unique.len(), OPTION_COUNT);
                for (slot, option) in q.options.iter().enumerate() {
                    assert_eq!(q.position_of(option), Some(slot));
                }
            }
        }
    }

    #[test]
    fn test_excluded_prompts_are_never_chosen() {
        let pool = animals();
        let excluded: HashSet<String> = ["hund", "katt", "fisk", "häst"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut rng = StdRng::seed_from_u64(3);

        let generated = QuestionGenerator::new(&pool, &pool).generate(&mut rng, &excluded);

        assert_eq!(generated.question.unwrap().prompt, "ko");
        assert_eq!(generated.excluded.len(), 5);
    }

    #[test]
    fn test_small_pool_yields_nothing() {
        let pool = animals()[..2].to_vec();
        let mut rng = StdRng::seed_from_u64(1);

        let generated = QuestionGenerator::new(&pool, &pool).generate(&mut rng, &no_exclusions());

        assert!(generated.question.is_none());
        assert!(generated.excluded.is_empty());
    }

    #[test]
    fn test_exhausted_prompts_yield_nothing() {
        let pool = animals();
        let excluded: HashSet<String> = pool.iter().map(|e| e.prompt.clone()).collect();
        let mut rng = StdRng::seed_from_u64(1);

        let generated = QuestionGenerator::new(&pool, &pool).generate(&mut rng, &excluded);

        assert!(generated.question.is_none());
        assert_eq!(generated.excluded, excluded);
    }

    #[test]
    fn test_distractors_are_padded_from_universe() {
        // Three entries, two sharing a displayed text, so the pool alone
        // cannot supply two distinct distractors.
        let pool = vec![
            entry("a", "甲", None),
            entry("b", "乙", None),
            entry("b2", "乙", None),
        ];
        let mut universe = pool.clone();
        universe.push(entry("c", "丙", None));
        let excluded: HashSet<String> = ["b", "b2"].iter().map(|s| s.to_string()).collect();
        let mut rng = StdRng::seed_from_u64(5);

        let q = QuestionGenerator::new(&pool, &universe)
            .generate(&mut rng, &excluded)
            .question
            .unwrap();

        assert_eq!(q.prompt, "a");
        let mut options = q.options.clone();
        options.sort();
        assert_eq!(options, vec!["丙", "乙", "甲"]);
    }

    #[test]
    fn test_recompute_keeps_order_and_swaps_text() {
        let entries = vec![
            entry("hund", "狗", None),
            entry("katt", "猫", Some("貓")),
            entry("fisk", "鱼", Some("魚")),
        ];
        let mut q = QuizQuestion::from_entries("katt", entries, false);
        assert_eq!(q.options, vec!["狗", "猫", "鱼"]);
        assert_eq!(q.correct_answer, "猫");

        q.recompute(true);

        assert_eq!(q.options, vec!["狗", "貓", "魚"]);
        assert_eq!(q.correct_answer, "貓");
        assert!(q.correct_is_alternate);
        assert_eq!(q.option_is_alternate, vec![false, true, true]);
        assert_eq!(q.option_pronunciations[1], "katt-hk");
        assert_eq!(q.position_of("貓"), Some(1));
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let pool = animals();
        let mut rng = StdRng::seed_from_u64(9);
        let mut q = QuestionGenerator::new(&pool, &pool)
            .generate(&mut rng, &no_exclusions())
            .question
            .unwrap();
        let before = q.clone();

        q.recompute(false);

        assert_eq!(q, before);
    }

    #[test]
    fn test_question_snapshot_field_names() {
        let q = QuizQuestion::from_entries("hund", animals()[..3].to_vec(), false);
        let json = serde_json::to_value(&q).unwrap();

        assert!(json.get("correctAnswer").is_some());
        assert!(json.get("optionIsAlternate").is_some());
        assert_eq!(json["sourceEntries"][0]["swedish"], "hund");
    }

    fn distinct_pool() -> impl Strategy<Value = Vec<VocabularyEntry>> {
        (3usize..25).prop_map(|n| {
            (0..n)
                .map(|i| {
                    let alt = (i % 2 == 0).then(|| format!("alt-{i}"));
                    entry(&format!("p{i}"), &format!("ans-{i}"), alt.as_deref())
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_generate_returns_distinct_options(
            pool in distinct_pool(),
            seed in any::<u64>(),
            excluded_share in 0.0f64..1.0,
            use_alternate in any::<bool>(),
        ) {
            let excluded_count = ((pool.len() as f64) * excluded_share) as usize;
            let excluded: HashSet<String> = pool
                .iter()
                .take(excluded_count.min(pool.len() - 1))
                .map(|e| e.prompt.clone())
                .collect();
            let mut rng = StdRng::seed_from_u64(seed);

            let generated = QuestionGenerator::new(&pool, &pool)
                .with_alternate(use_alternate)
                .generate(&mut rng, &excluded);
            let q = generated.question.expect("question");

            prop_assert_eq!(q.options.len(), OPTION_COUNT);
            let unique: HashSet<&String> = q.options.iter().collect();
            prop_assert_eq!(unique.len(), OPTION_COUNT);
            prop_assert!(!excluded.contains(&q.prompt));

            let added: Vec<&String> = generated.excluded.difference(&excluded).collect();
            prop_assert_eq!(added.len(), 1);
            let correct = pool.iter().find(|e| &e.prompt == added[0]).unwrap();
            prop_assert_eq!(q.correct_answer.as_str(), display_text(correct, use_alternate));
        }
    }
}
