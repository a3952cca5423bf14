//! In-memory idempotency ledger.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::foundation::DomainError;
use crate::ports::{ProcessedEvent, ProcessedEventStore, SaveResult};

/// Ledger keyed by (provider, external id). The map entry API gives the
/// same first-writer-wins behavior as the database unique constraint.
#[derive(Default)]
pub struct InMemoryProcessedEventStore {
    events: Mutex<HashMap<(String, String), ProcessedEvent>>,
}

impl InMemoryProcessedEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.lock().await.is_empty()
    }

    pub async fn get(&self, provider: &str, external_id: &str) -> Option<ProcessedEvent> {
        self.events
            .lock()
            .await
            .get(&(provider.to_string(), external_id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl ProcessedEventStore for InMemoryProcessedEventStore {
    async fn contains(&self, provider: &str, external_id: &str) -> Result<bool, DomainError> {
        Ok(self
            .events
            .lock()
            .await
            .contains_key(&(provider.to_string(), external_id.to_string())))
    }

    async fn record(&self, event: ProcessedEvent) -> Result<SaveResult, DomainError> {
        let mut events = self.events.lock().await;
        let key = (event.provider.clone(), event.external_id.clone());
        if events.contains_key(&key) {
            return Ok(SaveResult::AlreadyExists);
        }
        events.insert(key, event);
        Ok(SaveResult::Inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;
    use std::sync::Arc;

    fn event(id: &str) -> ProcessedEvent {
        ProcessedEvent::new("stripe", id, "checkout.session.completed", None, Timestamp::now())
    }

    #[tokio::test]
    async fn second_record_reports_already_exists() {
        let store = InMemoryProcessedEventStore::new();
        assert_eq!(store.record(event("evt_1")).await.unwrap(), SaveResult::Inserted);
        assert_eq!(store.record(event("evt_1")).await.unwrap(), SaveResult::AlreadyExists);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn same_id_under_different_providers_is_distinct() {
        let store = InMemoryProcessedEventStore::new();
        store.record(event("msg_1")).await.unwrap();
        let other = ProcessedEvent::new("whatsapp", "msg_1", "message", None, Timestamp::now());
        assert_eq!(store.record(other).await.unwrap(), SaveResult::Inserted);
        assert!(store.contains("whatsapp", "msg_1").await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_records_have_one_winner() {
        let store = Arc::new(InMemoryProcessedEventStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.record(event("evt_race")).await.unwrap() })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap() == SaveResult::Inserted {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
    }
}
