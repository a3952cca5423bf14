//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresLeadRepository` - Lead rows, locked transitions and CAS updates
//! - `PostgresAnswerRepository` - Append-only answers
//! - `PostgresProcessedEventStore` - Idempotency ledger
//!
//! Schema lives in `migrations/` and is applied with `sqlx::migrate!`.

mod answer_repository;
mod lead_repository;
mod processed_event_store;

pub use answer_repository::PostgresAnswerRepository;
pub use lead_repository::PostgresLeadRepository;
pub use processed_event_store::PostgresProcessedEventStore;
