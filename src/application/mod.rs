//! Application layer - Command handlers.
//!
//! Handlers commit state through the ports and return outbound message
//! intents. Delivery happens afterwards in `deliver_outbound`, so a
//! failed send never rolls back a committed transition.

mod delivery;
pub mod handlers;

pub use delivery::{deliver_outbound, DeliveryReport};
pub use handlers::admin::{
    AdminActionResult, ApproveLeadCommand, ApproveLeadHandler, MarkBookedCommand,
    MarkBookedHandler, OfferSlotsCommand, OfferSlotsHandler, RejectLeadCommand, RejectLeadHandler,
    ResumeFromHandoffCommand, ResumeFromHandoffHandler,
};
pub use handlers::conversation::{
    HandleInboundMessageCommand, HandleInboundMessageHandler, HandleInboundMessageResult,
    RepairDecision, RepairTracker,
};
pub use handlers::lead::{
    SweepInactiveLeadsCommand, SweepInactiveLeadsHandler, SweepInactiveLeadsResult,
};
pub use handlers::payment::{
    HandlePaymentConfirmationCommand, HandlePaymentConfirmationHandler,
    HandlePaymentConfirmationResult,
};
