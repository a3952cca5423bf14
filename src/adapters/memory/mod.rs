//! In-memory adapters.
//!
//! Share the semantics of the Postgres adapters, including the
//! concurrency primitives, without a database.

mod lead_store;
mod message_sender;
mod processed_event_store;

pub use lead_store::InMemoryLeadStore;
pub use message_sender::RecordingMessageSender;
pub use processed_event_store::InMemoryProcessedEventStore;
