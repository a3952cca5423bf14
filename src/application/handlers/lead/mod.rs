//! Lead maintenance handlers.

mod sweep_inactive_leads;

pub use sweep_inactive_leads::{
    SweepInactiveLeadsCommand, SweepInactiveLeadsHandler, SweepInactiveLeadsResult,
};
