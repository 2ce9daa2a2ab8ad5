use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use seekyours_core::{AggregateId, EventId};
use seekyours_events::{Event, EventEnvelope, Notification};
use std::sync::Arc;

/// An event ready to be appended to a stream (not yet assigned a sequence number).
///
/// ## Event Lifecycle
///
/// 1. **Pending envelope**: recorded by an aggregate's `apply_change`
/// 2. **UncommittedEvent**: serialized, tagged with the aggregate type
/// 3. **StoredEvent**: persisted with an assigned `sequence_number`
/// 4. **Notification**: published to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: EventId,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

/// A stored event in an append-only stream (assigned a sequence number).
///
/// Sequence numbers are assigned by the event store during append and are:
/// - **Monotonically increasing**: each event gets `last + 1`
/// - **Stream-scoped**: one counter per aggregate identity, starting at 1
/// - **Immutable**: once assigned, never changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: EventId,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,

    /// Monotonically increasing position in the aggregate stream.
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl UncommittedEvent {
    /// Serialize a typed envelope recorded by an aggregate of kind `aggregate_type`.
    pub fn from_envelope<E>(
        aggregate_type: impl Into<String>,
        envelope: &EventEnvelope<E>,
    ) -> Result<Self, EventStoreError>
    where
        E: Event + Serialize,
    {
        let payload = serde_json::to_value(envelope.payload()).map_err(|e| {
            EventStoreError::Serialization(format!("payload serialization failed: {e}"))
        })?;

        Ok(Self {
            event_id: envelope.event_id(),
            aggregate_id: envelope.aggregate_id(),
            aggregate_type: aggregate_type.into(),
            event_type: envelope.event_type().to_string(),
            event_version: envelope.payload().version(),
            occurred_at: envelope.occurred_at(),
            payload,
        })
    }
}

impl StoredEvent {
    /// Decode the stored payload back into a typed envelope.
    ///
    /// Rejects records whose stored tag does not match the decoded variant.
    pub fn to_envelope<E>(&self) -> Result<EventEnvelope<E>, EventStoreError>
    where
        E: Event + DeserializeOwned,
    {
        let payload: E = serde_json::from_value(self.payload.clone()).map_err(|e| {
            EventStoreError::Serialization(format!(
                "payload deserialization failed (sequence_number={}): {e}",
                self.sequence_number
            ))
        })?;

        if payload.event_type() != self.event_type {
            return Err(EventStoreError::Serialization(format!(
                "stored tag '{}' does not match payload '{}' (sequence_number={})",
                self.event_type,
                payload.event_type(),
                self.sequence_number
            )));
        }

        Ok(EventEnvelope::from_parts(
            self.event_id,
            self.aggregate_id,
            self.event_type.clone(),
            self.occurred_at,
            payload,
        ))
    }

    /// Convert a stored event into the message published to subscribers.
    pub fn to_notification(&self) -> Notification {
        Notification::new(
            self.aggregate_type.clone(),
            self.sequence_number,
            EventEnvelope::from_parts(
                self.event_id,
                self.aggregate_id,
                self.event_type.clone(),
                self.occurred_at,
                self.payload.clone(),
            ),
        )
    }
}

/// Event store operation error.
///
/// These are **infrastructure errors** (storage, encoding) as opposed to domain
/// errors (validation, invariants).
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("aggregate type mismatch: {0}")]
    AggregateTypeMismatch(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Append-only event store (the unit of work behind the repository).
///
/// ## Design Principles
///
/// - **No storage assumptions**: in-memory for tests/dev, any durable append-only
///   backend in production
/// - **Append-only**: events are never modified, reordered or deleted
/// - **No concurrency control**: appends for the same identity are simply
///   serialized one after another (last writer wins)
///
/// ## Append Semantics
///
/// `append()`:
/// - routes every event to the stream of the identity it carries
/// - assigns per-stream sequence numbers (starting at current length + 1)
/// - persists the whole batch or nothing
/// - returns the committed records in input order
///
/// ## Load Semantics
///
/// `events_for()`:
/// - returns every event for the identity, oldest first
/// - returns an empty vector for an unknown identity (never an error)
pub trait EventStore: Send + Sync {
    fn append(&self, events: Vec<UncommittedEvent>) -> Result<Vec<StoredEvent>, EventStoreError>;

    fn events_for(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(&self, events: Vec<UncommittedEvent>) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(events)
    }

    fn events_for(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).events_for(aggregate_id)
    }
}
