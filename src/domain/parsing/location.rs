//! Client location parsing.
//!
//! Permissive by design: anything non-empty produces a result, and
//! answers that cannot be placed are flagged for follow-up instead of
//! being rejected.

use serde::{Deserialize, Serialize};

use super::normalize::normalize;

/// Phrases meaning "I can travel anywhere".
const FLEXIBLE_PHRASES: &[&str] = &[
    "anywhere",
    "flexible",
    "wherever",
    "don't mind",
    "dont mind",
    "no preference",
    "happy to travel",
    "willing to travel",
    "any city",
    "not fussed",
];

/// Country aliases mapped to canonical names. The parser tries the
/// longest trailing token run first, so multi-word aliases win.
const COUNTRIES: &[(&str, &str)] = &[
    ("uk", "United Kingdom"),
    ("u.k", "United Kingdom"),
    ("united kingdom", "United Kingdom"),
    ("great britain", "United Kingdom"),
    ("britain", "United Kingdom"),
    ("england", "United Kingdom"),
    ("scotland", "United Kingdom"),
    ("wales", "United Kingdom"),
    ("northern ireland", "United Kingdom"),
    ("ireland", "Ireland"),
    ("france", "France"),
    ("germany", "Germany"),
    ("spain", "Spain"),
    ("italy", "Italy"),
    ("portugal", "Portugal"),
    ("netherlands", "Netherlands"),
    ("the netherlands", "Netherlands"),
    ("holland", "Netherlands"),
    ("belgium", "Belgium"),
    ("sweden", "Sweden"),
    ("norway", "Norway"),
    ("denmark", "Denmark"),
    ("usa", "United States"),
    ("united states", "United States"),
    ("america", "United States"),
    ("canada", "Canada"),
    ("australia", "Australia"),
    ("new zealand", "New Zealand"),
    ("switzerland", "Switzerland"),
];

/// Leading words dropped from the city part of an answer.
const LEADING_FILLER: &[&str] = &["in", "near", "from", "around", "based"];

/// Known cities and the country they belong to.
const CITIES: &[(&str, &str)] = &[
    ("london", "United Kingdom"),
    ("manchester", "United Kingdom"),
    ("birmingham", "United Kingdom"),
    ("leeds", "United Kingdom"),
    ("liverpool", "United Kingdom"),
    ("bristol", "United Kingdom"),
    ("brighton", "United Kingdom"),
    ("glasgow", "United Kingdom"),
    ("edinburgh", "United Kingdom"),
    ("cardiff", "United Kingdom"),
    ("belfast", "United Kingdom"),
    ("newcastle", "United Kingdom"),
    ("nottingham", "United Kingdom"),
    ("sheffield", "United Kingdom"),
    ("dublin", "Ireland"),
    ("paris", "France"),
    ("berlin", "Germany"),
    ("amsterdam", "Netherlands"),
    ("madrid", "Spain"),
    ("barcelona", "Spain"),
    ("lisbon", "Portugal"),
    ("rome", "Italy"),
    ("milan", "Italy"),
    ("new york", "United States"),
    ("los angeles", "United States"),
    ("toronto", "Canada"),
    ("sydney", "Australia"),
    ("melbourne", "Australia"),
];

/// Result of parsing a location answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedLocation {
    pub city: Option<String>,
    pub country: Option<String>,
    pub flexible: bool,
    pub needs_follow_up: bool,
}

impl ParsedLocation {
    fn flexible() -> Self {
        Self {
            city: None,
            country: None,
            flexible: true,
            needs_follow_up: false,
        }
    }
}

/// Parses a location answer.
///
/// Returns `None` only for empty input.
pub fn parse_location(text: &str) -> Option<ParsedLocation> {
    let normalized = normalize(text);
    let lowered = normalized.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| match c {
            '\u{2019}' => '\'',
            c if c.is_alphanumeric() || c == '\'' || c == '.' => c,
            _ => ' ',
        })
        .collect();
    let tokens: Vec<&str> = cleaned
        .split_whitespace()
        .map(|t| t.trim_end_matches('.'))
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return None;
    }

    let joined = tokens.join(" ");
    if FLEXIBLE_PHRASES.iter().any(|p| contains_phrase(&joined, p)) {
        return Some(ParsedLocation::flexible());
    }

    // Trailing country, remainder is the city.
    for take in (1..=tokens.len().min(3)).rev() {
        let split = tokens.len() - take;
        let candidate = tokens[split..].join(" ");
        if let Some(country) = lookup(COUNTRIES, &candidate) {
            let remainder = strip_leading_filler(&tokens[..split]);
            let city = if remainder.is_empty() {
                None
            } else {
                Some(title_case(remainder))
            };
            return Some(ParsedLocation {
                city,
                country: Some(country.to_string()),
                flexible: false,
                needs_follow_up: false,
            });
        }
    }

    // City-only answers.
    for take in (1..=tokens.len().min(3)).rev() {
        for start in 0..=(tokens.len() - take) {
            let candidate = tokens[start..start + take].join(" ");
            if let Some(country) = lookup(CITIES, &candidate) {
                return Some(ParsedLocation {
                    city: Some(title_case(&tokens[start..start + take])),
                    country: Some(country.to_string()),
                    flexible: false,
                    needs_follow_up: false,
                });
            }
        }
    }

    Some(ParsedLocation {
        city: Some(normalized),
        country: None,
        flexible: false,
        needs_follow_up: true,
    })
}

fn lookup(table: &[(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn strip_leading_filler<'a, 'b>(tokens: &'a [&'b str]) -> &'a [&'b str] {
    let skip = tokens
        .iter()
        .take_while(|t| LEADING_FILLER.contains(*t))
        .count();
    &tokens[skip..]
}

fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    let padded = format!(" {} ", haystack);
    padded.contains(&format!(" {} ", phrase))
}

fn title_case(tokens: &[&str]) -> String {
    tokens
        .iter()
        .map(|t| {
            let mut chars = t.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flexible_vocabulary_is_recognised() {
        let loc = parse_location("Honestly anywhere!").unwrap();
        assert!(loc.flexible);
        assert_eq!(loc.city, None);
        assert_eq!(loc.country, None);
        assert!(!loc.needs_follow_up);

        assert!(parse_location("I don't mind").unwrap().flexible);
        assert!(parse_location("I don\u{2019}t mind").unwrap().flexible);
    }

    #[test]
    fn city_and_country_are_split() {
        let loc = parse_location("Leeds, England").unwrap();
        assert_eq!(loc.city.as_deref(), Some("Leeds"));
        assert_eq!(loc.country.as_deref(), Some("United Kingdom"));
    }

    #[test]
    fn leading_preposition_is_not_part_of_city() {
        let loc = parse_location("in leeds uk").unwrap();
        assert_eq!(loc.city.as_deref(), Some("Leeds"));
        assert_eq!(loc.country.as_deref(), Some("United Kingdom"));

        let loc = parse_location("based near Bath, England").unwrap();
        assert_eq!(loc.city.as_deref(), Some("Bath"));

        let loc = parse_location("from uk").unwrap();
        assert_eq!(loc.city, None);
        assert_eq!(loc.country.as_deref(), Some("United Kingdom"));
    }

    #[test]
    fn multi_word_country_is_matched() {
        let loc = parse_location("Austin United States").unwrap();
        assert_eq!(loc.city.as_deref(), Some("Austin"));
        assert_eq!(loc.country.as_deref(), Some("United States"));
    }

    #[test]
    fn country_only_answer_has_no_city() {
        let loc = parse_location("france").unwrap();
        assert_eq!(loc.city, None);
        assert_eq!(loc.country.as_deref(), Some("France"));
    }

    #[test]
    fn known_city_resolves_country() {
        let loc = parse_location("London").unwrap();
        assert_eq!(loc.city.as_deref(), Some("London"));
        assert_eq!(loc.country.as_deref(), Some("United Kingdom"));

        let loc = parse_location("near new york").unwrap();
        assert_eq!(loc.city.as_deref(), Some("New York"));
        assert_eq!(loc.country.as_deref(), Some("United States"));
    }

    #[test]
    fn unknown_place_needs_follow_up() {
        let loc = parse_location("Little Snoring").unwrap();
        assert!(loc.needs_follow_up);
        assert_eq!(loc.city.as_deref(), Some("Little Snoring"));
        assert_eq!(loc.country, None);
    }

    #[test]
    fn empty_input_is_none() {
        assert_eq!(parse_location("   "), None);
        assert_eq!(parse_location("!!"), None);
    }
}
