//! Text canonicalisation applied before every parser.
//!
//! All variants are pure and idempotent: running them twice yields the
//! same string as running them once.

use unicode_normalization::UnicodeNormalization;

/// Characters that render as nothing and are dropped outright.
const ZERO_WIDTH: [char; 5] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

/// Glyphs clients type (or keyboards autocorrect to) for "by".
const MULTIPLICATION_GLYPHS: [char; 6] = [
    '\u{00D7}', // ×
    '\u{2715}', // ✕
    '\u{2716}', // ✖
    '\u{2A2F}', // ⨯
    '\u{FF38}', // Ｘ
    '\u{FF58}', // ｘ
];

/// Trims, collapses whitespace runs, drops zero-width characters and
/// applies NFC composition.
///
/// Non-breaking and other exotic spaces are Unicode whitespace, so the
/// collapse step folds them into a single ASCII space.
pub fn normalize(text: &str) -> String {
    let visible: String = text.chars().filter(|c| !ZERO_WIDTH.contains(c)).collect();
    let composed: String = visible.nfc().collect();
    composed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalisation for dimension answers: multiplication glyphs become `x`.
///
/// The glyphs are mapped before composition so that an `x` followed by a
/// combining mark is composed on the first pass, not the second.
pub fn normalize_for_dimensions(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|c| if MULTIPLICATION_GLYPHS.contains(&c) { 'x' } else { c })
        .collect();
    normalize(&mapped)
}

/// Normalisation for budget answers. Currency stripping is the budget
/// parser's job, so this adds nothing on top of [`normalize`].
pub fn normalize_for_budget(text: &str) -> String {
    normalize(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn trims_and_collapses_whitespace() {
        assert_eq!(normalize("  a   rose\t\n on  my arm "), "a rose on my arm");
    }

    #[test]
    fn folds_non_breaking_spaces() {
        assert_eq!(normalize("10\u{00A0}cm\u{202F}wide"), "10 cm wide");
    }

    #[test]
    fn removes_zero_width_characters() {
        assert_eq!(normalize("£4\u{200B}00"), "£400");
        assert_eq!(normalize("\u{FEFF}hello"), "hello");
    }

    #[test]
    fn composes_combining_marks() {
        assert_eq!(normalize("cafe\u{0301}"), "caf\u{00E9}");
    }

    #[test]
    fn composes_across_removed_zero_width() {
        assert_eq!(normalize("e\u{200B}\u{0301}"), "\u{00E9}");
    }

    #[test]
    fn empty_input_yields_empty_string() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \u{00A0} "), "");
    }

    #[test]
    fn dimension_variant_maps_multiplication_signs() {
        assert_eq!(normalize_for_dimensions("10×15cm"), "10x15cm");
        assert_eq!(normalize_for_dimensions("10 ✕ 15 cm"), "10 x 15 cm");
    }

    #[test]
    fn budget_variant_leaves_symbols_alone() {
        assert_eq!(normalize_for_budget(" £400 × 2 "), "£400 × 2");
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in "\\PC*") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn dimension_normalize_is_idempotent(s in "\\PC*") {
            let once = normalize_for_dimensions(&s);
            prop_assert_eq!(normalize_for_dimensions(&once), once);
        }

        #[test]
        fn normalize_is_idempotent_with_exotic_spaces(
            parts in proptest::collection::vec("[a-z0-9£×]{0,4}", 0..6),
            sep in prop_oneof![Just("\u{00A0}"), Just("\u{200B}"), Just("  "), Just("\t")],
        ) {
            let s = parts.join(sep);
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }
    }
}
