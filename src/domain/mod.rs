//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine trait)
//! - `parsing` - Text normalizer, field parsers and answer guards
//! - `lead` - Lead aggregate, status table, answers and derived qualification
//! - `conversation` - Inbound/outbound message shapes, routing table and copy
//! - `payment` - Payment webhook verification and deposit confirmations

pub mod conversation;
pub mod foundation;
pub mod lead;
pub mod parsing;
pub mod payment;
