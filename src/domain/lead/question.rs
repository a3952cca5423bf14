//! The fixed qualification question sequence.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::parse_failures::ParseField;
use crate::domain::foundation::ValidationError;

/// Identifier of one qualification question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKey {
    Idea,
    Placement,
    Dimensions,
    Style,
    Budget,
    Location,
    Timing,
}

/// Questions in the order they are asked. `Lead::current_step` indexes
/// into this array.
pub const QUESTION_SEQUENCE: [QuestionKey; 7] = [
    QuestionKey::Idea,
    QuestionKey::Placement,
    QuestionKey::Dimensions,
    QuestionKey::Style,
    QuestionKey::Budget,
    QuestionKey::Location,
    QuestionKey::Timing,
];

impl QuestionKey {
    /// Question asked at `step`, or `None` once the sequence is exhausted.
    pub fn at(step: u32) -> Option<QuestionKey> {
        QUESTION_SEQUENCE.get(step as usize).copied()
    }

    /// Step index of this question.
    pub fn step(&self) -> u32 {
        QUESTION_SEQUENCE
            .iter()
            .position(|k| k == self)
            .unwrap_or_default() as u32
    }

    pub fn is_last(&self) -> bool {
        self.step() as usize + 1 == QUESTION_SEQUENCE.len()
    }

    /// The structured field this question is parsed into, if any.
    /// Questions without one accept any non-empty text.
    pub fn parse_field(&self) -> Option<ParseField> {
        match self {
            QuestionKey::Dimensions => Some(ParseField::Dimensions),
            QuestionKey::Budget => Some(ParseField::Budget),
            QuestionKey::Location => Some(ParseField::Location),
            QuestionKey::Idea | QuestionKey::Placement | QuestionKey::Style | QuestionKey::Timing => {
                None
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKey::Idea => "idea",
            QuestionKey::Placement => "placement",
            QuestionKey::Dimensions => "dimensions",
            QuestionKey::Style => "style",
            QuestionKey::Budget => "budget",
            QuestionKey::Location => "location",
            QuestionKey::Timing => "timing",
        }
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QUESTION_SEQUENCE
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                ValidationError::invalid_format("question_key", format!("unknown question '{}'", s))
            })
    }
}
