//! Lead module - The intake conversation aggregate.
//!
//! # Module Organization
//!
//! - `status` - Lead lifecycle and the transition table
//! - `aggregate` - The `Lead` aggregate and status-change bookkeeping
//! - `question` - The fixed qualification question sequence
//! - `answers` - Append-only answers and the latest-wins view
//! - `parse_failures` - Per-field repair counters
//! - `derived` - Size, region and price derived on completion
//! - `summary` - Artist summary and handoff context
//! - `errors` - Lead workflow errors

mod aggregate;
mod answers;
mod derived;
mod errors;
mod parse_failures;
mod question;
mod status;
mod summary;

pub use aggregate::{check_transition, Lead, LeadPatch};
pub use answers::{Answer, CurrentAnswers, NewAnswer};
pub use derived::{
    derive_qualification, PriceEstimate, Qualification, QualificationPolicy, RegionBucket,
    SizeCategory,
};
pub use errors::LeadError;
pub use parse_failures::{ParseFailureCounts, ParseField};
pub use question::{QuestionKey, QUESTION_SEQUENCE};
pub use status::LeadStatus;
pub use summary::{build_summary, format_pence, HandoffContext};
