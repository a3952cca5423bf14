//! Conversation module - Message shapes, routing and copy.

pub mod copy;
mod messages;
mod routes;

pub use messages::{Audience, InboundMessage, OutboundMessage, WHATSAPP_PROVIDER};
pub use routes::{route_for, Route};
