//! Answer guards for the qualification questions.
//!
//! These run before an answer is accepted and catch replies that parse,
//! but as the wrong thing.

use super::budget::{contains_marked_amount, parse_budget};
use super::dimensions::{contains_dimension, parse_dimensions};
use super::normalize::normalize;

/// Below this share of alphabetic characters a free-text answer is
/// suspected of being a number-shaped answer to another question.
pub const WRONG_FIELD_ALPHA_RATIO: f64 = 0.6;

/// Signals needed for a message without both a size and a budget to be
/// treated as a bundle.
const BUNDLE_SIGNAL_THRESHOLD: usize = 3;

const STYLE_WORDS: &[&str] = &[
    "fine line",
    "fineline",
    "blackwork",
    "black work",
    "traditional",
    "neo traditional",
    "realism",
    "realistic",
    "watercolour",
    "watercolor",
    "geometric",
    "dotwork",
    "minimalist",
    "japanese",
    "tribal",
    "script",
    "lettering",
    "illustrative",
];

const PLACEMENT_WORDS: &[&str] = &[
    "arm", "forearm", "upper arm", "wrist", "ankle", "back", "chest", "shoulder", "leg", "thigh",
    "calf", "ribs", "hand", "finger", "neck", "hip", "sternum", "spine", "foot",
];

/// The question a misplaced answer appears to belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrongField {
    Dimensions,
    Budget,
}

impl WrongField {
    pub fn as_str(&self) -> &'static str {
        match self {
            WrongField::Dimensions => "dimensions",
            WrongField::Budget => "budget",
        }
    }
}

/// Share of non-space characters that are alphabetic. Empty text is 0.
pub fn alpha_ratio(text: &str) -> f64 {
    let mut total = 0usize;
    let mut alpha = 0usize;
    for c in text.chars().filter(|c| !c.is_whitespace()) {
        total += 1;
        if c.is_alphabetic() {
            alpha += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        alpha as f64 / total as f64
    }
}

/// Flags a free-text answer that is really a size or a budget.
///
/// Both conditions must hold: mostly non-alphabetic, and the text
/// actually parses as the other field. Budgets additionally need a
/// currency marker so that a bare year or quantity is not caught.
pub fn detect_wrong_field(text: &str) -> Option<WrongField> {
    let normalized = normalize(text);
    if normalized.is_empty() || alpha_ratio(&normalized) >= WRONG_FIELD_ALPHA_RATIO {
        return None;
    }
    if parse_dimensions(&normalized).is_some() {
        return Some(WrongField::Dimensions);
    }
    if contains_marked_amount(&normalized) && parse_budget(&normalized).is_some() {
        return Some(WrongField::Budget);
    }
    None
}

/// Flags a message that answers several questions at once.
pub fn detect_answer_bundle(text: &str) -> bool {
    let lowered = normalize(text).to_lowercase();
    if lowered.is_empty() {
        return false;
    }
    let has_dimension = contains_dimension(&lowered);
    let has_budget = contains_marked_amount(&lowered);
    if has_dimension && has_budget {
        return true;
    }

    let words = word_text(&lowered);
    let signals = [
        has_dimension,
        has_budget,
        STYLE_WORDS.iter().any(|w| contains_words(&words, w)),
        PLACEMENT_WORDS.iter().any(|w| contains_words(&words, w)),
    ];
    signals.iter().filter(|s| **s).count() >= BUNDLE_SIGNAL_THRESHOLD
}

/// Letters only, single spaced and padded so phrase lookups match whole words.
fn word_text(lowered: &str) -> String {
    let letters: String = lowered
        .chars()
        .map(|c| if c.is_alphabetic() { c } else { ' ' })
        .collect();
    format!(" {} ", letters.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn contains_words(padded: &str, phrase: &str) -> bool {
    padded.contains(&format!(" {} ", phrase))
}
