//! Conversation handlers.
//!
//! Drives the intake conversation for one inbound message at a time and
//! tracks per-field repair attempts.

mod handle_inbound_message;
mod repair_tracker;

pub use handle_inbound_message::{
    HandleInboundMessageCommand, HandleInboundMessageHandler, HandleInboundMessageResult,
};
pub use repair_tracker::{RepairDecision, RepairTracker};
