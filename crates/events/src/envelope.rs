use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use seekyours_core::{AggregateId, EventId};

use crate::event::{Event, EventKind};

/// Envelope for an event: the payload plus the tag it was recorded under.
///
/// This is the unit an aggregate timeline is made of and the unit you persist.
///
/// Notes:
/// - `event_type` is the runtime tag; for envelopes built with [`EventEnvelope::new`]
///   it always equals `payload.event_type()`.
/// - Typed retrieval ([`EventEnvelope::downcast`]) only yields payloads stored under
///   the requested tag.
/// - `payload` is generic so the same envelope carries typed events inside an
///   aggregate and JSON values once type-erased for publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: EventId,
    aggregate_id: AggregateId,
    event_type: String,
    occurred_at: DateTime<Utc>,
    payload: E,
}

impl<E: Event> EventEnvelope<E> {
    /// Box a freshly produced event, stamping a new event id and the current time.
    pub fn new(payload: E) -> Self {
        Self {
            event_id: EventId::new(),
            aggregate_id: payload.aggregate_id(),
            event_type: payload.event_type().to_string(),
            occurred_at: Utc::now(),
            payload,
        }
    }

    /// The payload as variant `T`, if this envelope was recorded under `T`'s tag.
    pub fn downcast<T: EventKind<E>>(&self) -> Option<&T> {
        if self.event_type != T::EVENT_TYPE {
            return None;
        }
        T::from_event(&self.payload)
    }

    /// Whether this envelope holds an event of kind `T`.
    pub fn is<T: EventKind<E>>(&self) -> bool {
        self.downcast::<T>().is_some()
    }
}

impl<E> EventEnvelope<E> {
    /// Reassemble an envelope from previously recorded parts (storage, transport).
    pub fn from_parts(
        event_id: EventId,
        aggregate_id: AggregateId,
        event_type: impl Into<String>,
        occurred_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            aggregate_id,
            event_type: event_type.into(),
            occurred_at,
            payload,
        }
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }

    /// Convert the payload, keeping the metadata.
    pub fn try_map_payload<F, T, Err>(self, f: F) -> Result<EventEnvelope<T>, Err>
    where
        F: FnOnce(E) -> Result<T, Err>,
    {
        Ok(EventEnvelope {
            event_id: self.event_id,
            aggregate_id: self.aggregate_id,
            event_type: self.event_type,
            occurred_at: self.occurred_at,
            payload: f(self.payload)?,
        })
    }
}
