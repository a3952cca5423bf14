//! Artist-facing summaries built from the latest-wins answer view.

use super::aggregate::Lead;
use super::answers::CurrentAnswers;
use super::derived::Qualification;
use super::question::QUESTION_SEQUENCE;
use super::status::LeadStatus;
use crate::domain::foundation::{ChannelId, LeadId};

/// Formats pence as pounds, e.g. `40000` → `£400`, `35050` → `£350.50`.
pub fn format_pence(pence: i64) -> String {
    if pence % 100 == 0 {
        format!("£{}", pence / 100)
    } else {
        format!("£{}.{:02}", pence / 100, (pence % 100).abs())
    }
}

/// Summary sent to the artist when a lead finishes qualification.
pub fn build_summary(lead: &Lead, answers: &CurrentAnswers, qualification: &Qualification) -> String {
    let mut lines = vec![format!("New lead {} ({})", lead.id, lead.channel_id)];
    for key in QUESTION_SEQUENCE {
        if let Some(text) = answers.get(key) {
            lines.push(format!("{}: {}", key, text));
        }
    }
    if let Some(size) = qualification.size_category {
        lines.push(format!("size: {}", size.as_str()));
    }
    if let Some(estimate) = qualification.estimate {
        lines.push(format!(
            "estimate: {}-{}",
            format_pence(estimate.min_pence),
            format_pence(estimate.max_pence)
        ));
    }
    lines.push(format!("region: {}", qualification.region.as_str()));
    if qualification.budget_below_minimum {
        lines.push("budget below minimum".to_string());
    }
    lines.join("\n")
}

/// What a person needs to pick up a paused conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffContext {
    pub lead_id: LeadId,
    pub channel_id: ChannelId,
    pub paused_from: Option<LeadStatus>,
    pub reason: String,
    pub answers: Vec<(String, String)>,
}

impl HandoffContext {
    pub fn build(lead: &Lead, answers: &CurrentAnswers, reason: impl Into<String>) -> Self {
        Self {
            lead_id: lead.id,
            channel_id: lead.channel_id.clone(),
            paused_from: lead.paused_from.or(Some(lead.status)),
            reason: reason.into(),
            answers: answers
                .iter()
                .map(|(k, text)| (k.to_string(), text.to_string()))
                .collect(),
        }
    }

    pub fn render(&self) -> String {
        let mut lines = vec![
            format!("Handoff for lead {} ({})", self.lead_id, self.channel_id),
            format!("reason: {}", self.reason),
        ];
        if let Some(status) = self.paused_from {
            lines.push(format!("paused at: {}", status));
        }
        for (key, text) in &self.answers {
            lines.push(format!("{}: {}", key, text));
        }
        lines.join("\n")
    }
}
