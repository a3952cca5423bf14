//! Tattoo size parsing.
//!
//! Accepts `<W><unit> x <H><unit>` (the first unit may be omitted and is
//! then inherited from the second) or a single `<N><unit>` meaning a
//! square piece. Units are centimetres or inches.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::normalize::normalize_for_dimensions;

/// Longest side accepted. Anything larger is almost always a unit slip
/// (millimetres typed as centimetres) rather than a real request.
pub const MAX_SIDE_CM: f64 = 100.0;

const CM_PER_INCH: f64 = 2.54;

const UNITS: &str = "cm|inches|inch|in";

static PAIR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(\d+(?:\.\d+)?)\s*({units})?\s*(?:x|by)\s*(\d+(?:\.\d+)?)(\s*)({units})\b",
        units = UNITS
    ))
    .expect("pair dimension pattern is valid")
});

/// A pair shape whose second side carries no unit, e.g. `10cm x 15`.
static UNFINISHED_PAIR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"\d+(?:\.\d+)?\s*(?:{units})?\s*(?:x|by)\s*\d",
        units = UNITS
    ))
    .expect("unfinished pair pattern is valid")
});

static SINGLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(\d+(?:\.\d+)?)(\s*)({units})\b", units = UNITS))
        .expect("single dimension pattern is valid")
});

/// A parsed tattoo size in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width_cm: f64,
    pub height_cm: f64,
}

impl Dimensions {
    pub fn area_cm2(&self) -> f64 {
        self.width_cm * self.height_cm
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Unit {
    Centimetres,
    Inches,
}

impl Unit {
    fn from_token(token: &str) -> Self {
        match token {
            "cm" => Unit::Centimetres,
            _ => Unit::Inches,
        }
    }

    fn to_cm(self, value: f64) -> f64 {
        match self {
            Unit::Centimetres => value,
            Unit::Inches => value * CM_PER_INCH,
        }
    }
}

/// Parses a size answer, returning `None` when no confident size exists.
///
/// Rejects answers with no unit, more than one standalone measurement,
/// non-positive sides, and sides above [`MAX_SIDE_CM`].
pub fn parse_dimensions(text: &str) -> Option<Dimensions> {
    let normalized = normalize_for_dimensions(text).to_lowercase();
    if normalized.is_empty() {
        return None;
    }

    let dims = if let Some(caps) = PAIR_RE.captures(&normalized) {
        let second = caps.get(5)?;
        if !is_unit(&normalized, caps.get(4)?.as_str(), second) {
            return None;
        }
        let second_unit = Unit::from_token(second.as_str());
        let first_unit = caps
            .get(2)
            .map(|m| Unit::from_token(m.as_str()))
            .unwrap_or(second_unit);
        let width: f64 = caps.get(1)?.as_str().parse().ok()?;
        let height: f64 = caps.get(3)?.as_str().parse().ok()?;
        Dimensions {
            width_cm: first_unit.to_cm(width),
            height_cm: second_unit.to_cm(height),
        }
    } else {
        if UNFINISHED_PAIR_RE.is_match(&normalized) {
            return None;
        }
        let mut singles = single_measurements(&normalized);
        let (value, unit) = singles.next()?;
        if singles.next().is_some() {
            return None;
        }
        let side = unit.to_cm(value);
        Dimensions {
            width_cm: side,
            height_cm: side,
        }
    };

    let in_bounds = |side: f64| side > 0.0 && side <= MAX_SIDE_CM;
    if in_bounds(dims.width_cm) && in_bounds(dims.height_cm) {
        Some(dims)
    } else {
        None
    }
}

/// True when a dimension-shaped fragment appears anywhere in the text.
pub fn contains_dimension(text: &str) -> bool {
    let normalized = normalize_for_dimensions(text).to_lowercase();
    PAIR_RE.is_match(&normalized) || single_measurements(&normalized).next().is_some()
}

fn single_measurements(normalized: &str) -> impl Iterator<Item = (f64, Unit)> + '_ {
    SINGLE_RE.captures_iter(normalized).filter_map(move |caps| {
        let unit = caps.get(3)?;
        if !is_unit(normalized, caps.get(2)?.as_str(), unit) {
            return None;
        }
        let value: f64 = caps.get(1)?.as_str().parse().ok()?;
        Some((value, Unit::from_token(unit.as_str())))
    })
}

/// A spaced-off `in` only counts as inches at the end of a clause, so
/// "10 in my arm" is not a size.
fn is_unit(normalized: &str, gap: &str, unit: regex::Match<'_>) -> bool {
    if unit.as_str() != "in" || gap.is_empty() {
        return true;
    }
    let rest = normalized[unit.end()..].trim_start();
    rest.is_empty() || rest.starts_with(|c: char| c.is_ascii_punctuation())
}
