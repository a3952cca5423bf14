//! Application handlers.
//!
//! - `conversation` - Inbound chat messages
//! - `admin` - Studio actions outside the chat thread
//! - `payment` - Deposit webhooks
//! - `lead` - Maintenance jobs

pub mod admin;
pub mod conversation;
pub mod lead;
pub mod payment;
