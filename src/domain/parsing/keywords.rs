//! Control keywords recognised in any conversation state.

use super::normalize::normalize;

/// Whole-message keywords that stop all messaging.
const OPT_OUT: &[&str] = &["stop", "stop all", "unsubscribe", "opt out", "optout", "opt-out"];

/// Whole-message keywords that restart a closed conversation.
const RESUME: &[&str] = &["start", "resume", "restart", "unstop", "start again"];

/// Whole-message keywords that lift a human-handoff pause.
const CONTINUE: &[&str] = &["continue", "carry on"];

/// Phrases asking for a person, matched anywhere in the message.
const HUMAN_REQUEST: &[&str] = &[
    "speak to a human",
    "talk to a human",
    "speak to someone",
    "talk to someone",
    "real person",
    "speak to the artist",
    "talk to the artist",
    "call me",
    "human please",
];

const YES: &[&str] = &[
    "yes", "y", "yeah", "yep", "yup", "sure", "ok", "okay", "sounds good", "definitely",
    "please", "yes please",
];

const NO: &[&str] = &["no", "n", "nope", "nah", "no thanks", "not really", "no thank you"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    OptOut,
    Resume,
    Continue,
    HumanRequest,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::OptOut => "opt_out",
            Keyword::Resume => "resume",
            Keyword::Continue => "continue",
            Keyword::HumanRequest => "human_request",
        }
    }
}

/// Classifies a control keyword. Opt-out is checked first.
///
/// Opt-out, resume and continue must be the whole message (ignoring case
/// and trailing punctuation) so that "please don't stop" is not an opt-out.
pub fn classify_keyword(text: &str) -> Option<Keyword> {
    let cleaned = clean(text);
    if cleaned.is_empty() {
        return None;
    }
    if OPT_OUT.contains(&cleaned.as_str()) {
        return Some(Keyword::OptOut);
    }
    if RESUME.contains(&cleaned.as_str()) {
        return Some(Keyword::Resume);
    }
    if CONTINUE.contains(&cleaned.as_str()) {
        return Some(Keyword::Continue);
    }
    if HUMAN_REQUEST.iter().any(|p| cleaned.contains(p)) {
        return Some(Keyword::HumanRequest);
    }
    None
}

/// Reads a yes/no reply. Anything else is `None`.
pub fn parse_yes_no(text: &str) -> Option<bool> {
    let cleaned = clean(text);
    if YES.contains(&cleaned.as_str()) {
        Some(true)
    } else if NO.contains(&cleaned.as_str()) {
        Some(false)
    } else {
        None
    }
}

fn clean(text: &str) -> String {
    let lowered = normalize(text).to_lowercase();
    lowered
        .trim_matches(|c: char| c.is_ascii_punctuation() && c != '-')
        .trim()
        .to_string()
}
