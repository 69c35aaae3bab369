//! Mainland / Hong Kong display resolution and the shared variant toggle.
//!
//! The resolver functions are pure: they take the toggle value as a
//! parameter instead of reading any ambient state.

use std::fmt;

use crate::vocabulary::VocabularyEntry;

/// Text shown for `entry`.
///
/// The alternate form is used only when the entry is flagged as having one;
/// differing text alone never switches the display.
pub fn display_text(entry: &VocabularyEntry, use_alternate: bool) -> &str {
    if use_alternate && entry.has_alternate && !entry.alternate_answer.is_empty() {
        &entry.alternate_answer
    } else {
        &entry.primary_answer
    }
}

/// Whether [`display_text`] yields a form that actually differs from the primary one.
pub fn is_alternate_displayed(entry: &VocabularyEntry, use_alternate: bool) -> bool {
    use_alternate
        && entry.has_alternate
        && !entry.alternate_answer.is_empty()
        && entry.alternate_answer != entry.primary_answer
}

/// Romanization matching the toggle; falls back to the primary one.
pub fn display_pronunciation(entry: &VocabularyEntry, use_alternate: bool) -> &str {
    match entry.alternate_pronunciation.as_deref() {
        Some(alt) if use_alternate && !alt.is_empty() => alt,
        _ => &entry.pronunciation,
    }
}

type Subscriber = Box<dyn FnMut(bool)>;

/// Process-wide observable for the Hong Kong variant preference.
///
/// Subscribers are notified only when the value really changes.
pub struct VariantToggle {
    value: bool,
    subscribers: Vec<Subscriber>,
}

impl VariantToggle {
    pub fn new(value: bool) -> Self {
        Self {
            value,
            subscribers: Vec::new(),
        }
    }

    pub fn get(&self) -> bool {
        self.value
    }

    /// Returns `true` when the value changed.
    pub fn set(&mut self, value: bool) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        for subscriber in self.subscribers.iter_mut() {
            subscriber(value);
        }
        true
    }

    pub fn toggle(&mut self) -> bool {
        let next = !self.value;
        self.set(next);
        next
    }

    pub fn subscribe<F>(&mut self, callback: F)
    where
        F: FnMut(bool) + 'static,
    {
        self.subscribers.push(Box::new(callback));
    }
}

impl Default for VariantToggle {
    fn default() -> Self {
        Self::new(false)
    }
}

impl fmt::Debug for VariantToggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariantToggle")
            .field("value", &self.value)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
