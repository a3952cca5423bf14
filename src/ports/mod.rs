//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Storage Ports
//!
//! - `LeadRepository` - Lead persistence with locked transitions and CAS primitives
//! - `AnswerRepository` - Append-only qualification answers
//! - `ProcessedEventStore` - Idempotency ledger for inbound messages and payment events
//!
//! ## Delivery Ports
//!
//! - `MessageSender` - Chat message delivery

mod answer_repository;
mod lead_repository;
mod message_sender;
mod processed_event_store;

pub use answer_repository::AnswerRepository;
pub use lead_repository::{InboundOrdering, LeadRepository, RowLock, StatusUpdate, StepAdvance};
pub use message_sender::MessageSender;
pub use processed_event_store::{ProcessedEvent, ProcessedEventStore, SaveResult};
