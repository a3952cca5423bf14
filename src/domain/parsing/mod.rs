//! Parsing module - Rule-based answer extraction.
//!
//! Every parser is a pure function returning `None` (or a typed
//! rejection) when it cannot extract a value with confidence. Parsers
//! never guess between plausible readings.
//!
//! # Module Organization
//!
//! - `normalize` - Text canonicalisation run before every parser
//! - `dimensions` - Tattoo size in centimetres
//! - `budget` - Budget in pence
//! - `location` - City, country or "flexible"
//! - `slot` - Appointment slot selection
//! - `keywords` - Opt-out, resume, continue and human-request keywords
//! - `guards` - Wrong-field and multi-answer-bundle detection

mod budget;
mod dimensions;
mod guards;
mod keywords;
mod location;
mod normalize;
mod slot;

pub use budget::{contains_marked_amount, parse_budget};
pub use dimensions::{contains_dimension, parse_dimensions, Dimensions, MAX_SIDE_CM};
pub use guards::{alpha_ratio, detect_answer_bundle, detect_wrong_field, WrongField, WRONG_FIELD_ALPHA_RATIO};
pub use keywords::{classify_keyword, parse_yes_no, Keyword};
pub use location::{parse_location, ParsedLocation};
pub use normalize::{normalize, normalize_for_budget, normalize_for_dimensions};
pub use slot::{parse_slot_selection, SlotRejection, TimeSlot, CLOCK_TOLERANCE_MINUTES};
