//! Per-field consecutive parse failure counters.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A field with a structured parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseField {
    Dimensions,
    Budget,
    Location,
    Slot,
}

impl ParseField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseField::Dimensions => "dimensions",
            ParseField::Budget => "budget",
            ParseField::Location => "location",
            ParseField::Slot => "slot",
        }
    }

    /// Reason code stored on the lead when this field escalates.
    pub fn escalation_reason(&self) -> String {
        format!("parse_failure:{}", self.as_str())
    }
}

impl fmt::Display for ParseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field name to consecutive failure count. Absent means zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParseFailureCounts(BTreeMap<ParseField, u32>);

impl ParseFailureCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: ParseField) -> u32 {
        self.0.get(&field).copied().unwrap_or(0)
    }

    /// Adds one failure and returns the new count.
    pub fn increment(&mut self, field: ParseField) -> u32 {
        let count = self.0.entry(field).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    pub fn reset(&mut self, field: ParseField) {
        self.0.remove(&field);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn should_escalate(&self, field: ParseField, threshold: u32) -> bool {
        self.get(field) >= threshold
    }
}
