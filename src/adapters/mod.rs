//! Adapters - Implementations of port interfaces.
//!
//! - `postgres` - sqlx-backed storage for leads, answers and the idempotency ledger
//! - `memory` - In-process storage with the same concurrency semantics
//! - `messaging` - Outbound message delivery

pub mod memory;
pub mod messaging;
pub mod postgres;

pub use memory::{InMemoryLeadStore, InMemoryProcessedEventStore, RecordingMessageSender};
pub use messaging::LoggingMessageSender;
pub use postgres::{PostgresAnswerRepository, PostgresLeadRepository, PostgresProcessedEventStore};
