//! Recorded qualification answers and the latest-wins view over them.
//!
//! Answers are append-only. A question may be answered more than once
//! (restart, correction), so every reader goes through [`CurrentAnswers`]
//! to pick one row per question: the latest by creation time, ties broken
//! by the storage-assigned id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::question::QuestionKey;
use crate::domain::foundation::{AnswerId, LeadId, Timestamp};

/// One stored answer row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub lead_id: LeadId,
    pub question_key: QuestionKey,
    pub text: String,
    pub created_at: Timestamp,
}

impl Answer {
    fn ordering_key(&self) -> (Timestamp, AnswerId) {
        (self.created_at, self.id)
    }
}

/// An answer about to be appended. Storage assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnswer {
    pub lead_id: LeadId,
    pub question_key: QuestionKey,
    pub text: String,
}

impl NewAnswer {
    pub fn new(lead_id: LeadId, question_key: QuestionKey, text: impl Into<String>) -> Self {
        Self {
            lead_id,
            question_key,
            text: text.into(),
        }
    }
}

/// One answer per question, resolved latest-wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentAnswers {
    by_key: BTreeMap<QuestionKey, Answer>,
}

impl CurrentAnswers {
    /// Builds the view from rows in any order.
    pub fn from_answers<'a>(answers: impl IntoIterator<Item = &'a Answer>) -> Self {
        let mut by_key: BTreeMap<QuestionKey, Answer> = BTreeMap::new();
        for answer in answers {
            match by_key.get(&answer.question_key) {
                Some(existing) if existing.ordering_key() >= answer.ordering_key() => {}
                _ => {
                    by_key.insert(answer.question_key, answer.clone());
                }
            }
        }
        Self { by_key }
    }

    pub fn get(&self, key: QuestionKey) -> Option<&str> {
        self.by_key.get(&key).map(|a| a.text.as_str())
    }

    pub fn contains(&self, key: QuestionKey) -> bool {
        self.by_key.contains_key(&key)
    }

    /// Answers in question order.
    pub fn iter(&self) -> impl Iterator<Item = (QuestionKey, &str)> {
        self.by_key.iter().map(|(k, a)| (*k, a.text.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
