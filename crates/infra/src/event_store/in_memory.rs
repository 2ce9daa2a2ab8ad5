use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use seekyours_core::AggregateId;

use super::r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// In-memory append-only event store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<AggregateId, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct aggregate streams.
    pub fn stream_count(&self) -> usize {
        self.read_streams().len()
    }

    /// Identities that have at least one recorded event.
    pub fn aggregate_ids(&self) -> Vec<AggregateId> {
        let mut ids: Vec<_> = self.read_streams().keys().copied().collect();
        ids.sort();
        ids
    }

    // Batches are validated before any stream is touched, so a poisoned lock still
    // guards complete streams and is recovered.
    fn read_streams(&self) -> RwLockReadGuard<'_, HashMap<AggregateId, Vec<StoredEvent>>> {
        self.streams
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_streams(&self) -> RwLockWriteGuard<'_, HashMap<AggregateId, Vec<StoredEvent>>> {
        self.streams
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current_version(stream: &[StoredEvent]) -> u64 {
        stream.last().map(|e| e.sequence_number).unwrap_or(0)
    }
}

impl EventStore for InMemoryEventStore {
    fn append(&self, events: Vec<UncommittedEvent>) -> Result<Vec<StoredEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        let mut streams = self.write_streams();

        // Validate the whole batch before touching any stream (all or nothing).
        let mut batch_types: HashMap<AggregateId, &str> = HashMap::new();
        for (idx, e) in events.iter().enumerate() {
            if e.aggregate_id.is_empty() {
                return Err(EventStoreError::InvalidAppend(format!(
                    "event '{}' carries the empty aggregate identity (index {idx})",
                    e.event_type
                )));
            }

            let stream_type = streams
                .get(&e.aggregate_id)
                .and_then(|s| s.first())
                .map(|first| first.aggregate_type.as_str());
            let expected = *batch_types
                .entry(e.aggregate_id)
                .or_insert_with(|| stream_type.unwrap_or(e.aggregate_type.as_str()));

            if expected != e.aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch(format!(
                    "stream {} has aggregate_type '{}', attempted append with '{}' (index {idx})",
                    e.aggregate_id, expected, e.aggregate_type
                )));
            }
        }

        // Assign sequence numbers and append (append-only).
        let mut committed = Vec::with_capacity(events.len());
        for e in events {
            let stream = streams.entry(e.aggregate_id).or_default();
            let stored = StoredEvent {
                event_id: e.event_id,
                aggregate_id: e.aggregate_id,
                aggregate_type: e.aggregate_type,
                sequence_number: Self::current_version(stream) + 1,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            };
            stream.push(stored.clone());
            committed.push(stored);
        }

        Ok(committed)
    }

    fn events_for(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        Ok(self
            .read_streams()
            .get(&aggregate_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use seekyours_core::EventId;

    fn uncommitted(aggregate_id: AggregateId, aggregate_type: &str, n: u64) -> UncommittedEvent {
        UncommittedEvent {
            event_id: EventId::new(),
            aggregate_id,
            aggregate_type: aggregate_type.to_string(),
            event_type: "tests.thing.happened".to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: serde_json::json!({ "n": n }),
        }
    }

    #[test]
    fn unknown_identity_yields_empty_stream() {
        let store = InMemoryEventStore::new();
        assert!(store.events_for(AggregateId::new()).unwrap().is_empty());
        assert_eq!(store.stream_count(), 0);
    }

    #[test]
    fn append_preserves_order_and_assigns_sequence_numbers() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        store
            .append(vec![uncommitted(id, "t", 1), uncommitted(id, "t", 2)])
            .unwrap();
        let second = store.append(vec![uncommitted(id, "t", 3)]).unwrap();
        assert_eq!(second[0].sequence_number, 3);

        let stream = store.events_for(id).unwrap();
        let ns: Vec<_> = stream.iter().map(|e| e.payload["n"].as_u64().unwrap()).collect();
        let seqs: Vec<_> = stream.iter().map(|e| e.sequence_number).collect();
        assert_eq!(ns, vec![1, 2, 3]);
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn batch_spanning_identities_is_routed_per_identity() {
        let store = InMemoryEventStore::new();
        let a = AggregateId::new();
        let b = AggregateId::new();

        let committed = store
            .append(vec![
                uncommitted(a, "t", 1),
                uncommitted(b, "t", 2),
                uncommitted(a, "t", 3),
            ])
            .unwrap();

        let seqs: Vec<_> = committed.iter().map(|e| e.sequence_number).collect();
        assert_eq!(seqs, vec![1, 1, 2]);
        assert_eq!(store.events_for(a).unwrap().len(), 2);
        assert_eq!(store.events_for(b).unwrap().len(), 1);
        assert_eq!(store.stream_count(), 2);

        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(store.aggregate_ids(), expected);
    }

    #[test]
    fn empty_identity_is_rejected_without_partial_write() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();

        let err = store
            .append(vec![uncommitted(id, "t", 1), uncommitted(AggregateId::EMPTY, "t", 2)])
            .unwrap_err();
        assert!(matches!(err, EventStoreError::InvalidAppend(_)));
        assert!(store.events_for(id).unwrap().is_empty());
    }

    #[test]
    fn poisoned_store_keeps_serving_streams() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store.append(vec![uncommitted(id, "t", 1)]).unwrap();

        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = store.streams.write().unwrap();
            panic!("store poisoned");
        }));
        assert!(store.streams.is_poisoned());

        assert_eq!(store.stream_count(), 1);
        assert_eq!(store.aggregate_ids(), vec![id]);
        let committed = store.append(vec![uncommitted(id, "t", 2)]).unwrap();
        assert_eq!(committed[0].sequence_number, 2);
        assert_eq!(store.events_for(id).unwrap().len(), 2);
    }

    #[test]
    fn aggregate_type_is_stable_per_stream() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store.append(vec![uncommitted(id, "customers.customer", 1)]).unwrap();

        let err = store
            .append(vec![uncommitted(id, "orders.order", 2)])
            .unwrap_err();
        assert!(matches!(err, EventStoreError::AggregateTypeMismatch(_)));

        let err = InMemoryEventStore::new()
            .append(vec![uncommitted(id, "a", 1), uncommitted(id, "b", 2)])
            .unwrap_err();
        assert!(matches!(err, EventStoreError::AggregateTypeMismatch(_)));
        assert_eq!(store.events_for(id).unwrap().len(), 1);
    }
}
