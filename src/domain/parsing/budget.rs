//! Budget parsing.
//!
//! Currency markers and thousands separators are stripped, then the first
//! number wins. A range such as "400-500" resolves to 400: ranges are
//! neither averaged nor maxed so the rule stays auditable.

use once_cell::sync::Lazy;
use regex::Regex;

use super::normalize::normalize_for_budget;

static CURRENCY_WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(gbp|usd|eur|euros?|pounds?|dollars?|quid|bucks)\b")
        .expect("currency word pattern is valid")
});

static THOUSANDS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d),(\d{3})\b").expect("thousands pattern is valid"));

static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(-?)\s*(\d+(?:\.\d+)?)(?:\s*(k)\b)?").expect("amount pattern is valid")
});

/// Currency-marked amount, used by the guards to tell budgets from other numbers.
static MARKED_AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"[£$€]\s*\d|\d\s*(k\b|gbp\b|usd\b|eur\b|euros?\b|pounds?\b|dollars?\b|quid\b)",
    )
    .expect("marked amount pattern is valid")
});

const CURRENCY_SYMBOLS: [char; 3] = ['£', '$', '€'];

/// Parses a budget into minor currency units (pence).
///
/// Returns `None` for empty text, text without digits, and zero or
/// negative amounts.
pub fn parse_budget(text: &str) -> Option<i64> {
    let lowered = normalize_for_budget(text).to_lowercase();
    let without_symbols: String = lowered
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c))
        .collect();
    let without_words = CURRENCY_WORD_RE.replace_all(&without_symbols, " ");
    let mut cleaned = without_words.into_owned();
    // Applied until stable so that "1,000,000" loses both separators.
    loop {
        let next = THOUSANDS_RE.replace_all(&cleaned, "$1$2").into_owned();
        if next == cleaned {
            break;
        }
        cleaned = next;
    }

    let caps = AMOUNT_RE.captures(&cleaned)?;
    if caps.get(1).map_or(false, |m| !m.as_str().is_empty()) {
        return None;
    }
    let mut amount: f64 = caps.get(2)?.as_str().parse().ok()?;
    if caps.get(3).is_some() {
        amount *= 1000.0;
    }
    if !amount.is_finite() || amount <= 0.0 {
        return None;
    }

    let pence = (amount * 100.0).round();
    if pence < 1.0 || pence > i64::MAX as f64 {
        return None;
    }
    Some(pence as i64)
}

/// True when the text carries an explicit currency marker next to a number.
pub fn contains_marked_amount(text: &str) -> bool {
    MARKED_AMOUNT_RE.is_match(&normalize_for_budget(text).to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn plain_and_marked_amounts_agree() {
        assert_eq!(parse_budget("£400"), Some(40000));
        assert_eq!(parse_budget("400gbp"), Some(40000));
        assert_eq!(parse_budget("400"), Some(40000));
        assert_eq!(parse_budget("400 pounds"), Some(40000));
        assert_eq!(parse_budget("$400 USD"), Some(40000));
    }

    #[test]
    fn zero_negative_and_empty_are_rejected() {
        assert_eq!(parse_budget("0"), None);
        assert_eq!(parse_budget("-400"), None);
        assert_eq!(parse_budget(""), None);
        assert_eq!(parse_budget("£0.00"), None);
    }

    #[test]
    fn text_without_digits_is_rejected() {
        assert_eq!(parse_budget("not sure yet"), None);
        assert_eq!(parse_budget("£££"), None);
    }

    #[test]
    fn k_suffix_multiplies_by_thousand() {
        assert_eq!(parse_budget("1.5k"), Some(150000));
        assert_eq!(parse_budget("£2k"), Some(200000));
        assert_eq!(parse_budget("2 k"), Some(200000));
    }

    #[test]
    fn k_must_stand_alone() {
        assert_eq!(parse_budget("2 kids"), Some(200));
    }

    #[test]
    fn thousands_separators_are_removed() {
        assert_eq!(parse_budget("£1,200"), Some(120000));
        assert_eq!(parse_budget("1,000,000"), Some(100000000));
    }

    #[test]
    fn decimals_are_kept() {
        assert_eq!(parse_budget("£350.50"), Some(35050));
    }

    #[test]
    fn ranges_resolve_to_first_number() {
        assert_eq!(parse_budget("400-500"), Some(40000));
        assert_eq!(parse_budget("between £300 and £600"), Some(30000));
    }

    #[test]
    fn marked_amount_detection() {
        assert!(contains_marked_amount("around £400"));
        assert!(contains_marked_amount("2k max"));
        assert!(contains_marked_amount("500 quid"));
        assert!(!contains_marked_amount("june 2025"));
        assert!(!contains_marked_amount("400"));
    }

    proptest! {
        #[test]
        fn whole_pound_amounts_round_trip_to_pence(n in 1i64..1_000_000) {
            prop_assert_eq!(parse_budget(&format!("£{}", n)), Some(n * 100));
        }

        #[test]
        fn negative_amounts_never_parse(n in 1i64..1_000_000) {
            prop_assert_eq!(parse_budget(&format!("-{}", n)), None);
        }
    }
}
