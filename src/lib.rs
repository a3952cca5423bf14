//! Tattoo Intake - Lead intake and booking core for a tattoo studio.
//!
//! Runs the chat qualification conversation with prospective clients,
//! hands off to a person when parsing keeps failing, and tracks each lead
//! through approval, deposit and booking. Chat delivery, payment session
//! creation and the HTTP surface are external collaborators.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
