use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use seekyours_core::AggregateId;

use crate::envelope::EventEnvelope;
use crate::event::Event;

/// A committed event, as published to read-side subscribers after a save.
///
/// The payload is type-erased to JSON so a single repository can publish events
/// of every aggregate kind through one subscriber list. Projectors turn it back
/// into a typed envelope with [`Notification::decode`].
///
/// Notifications are transient: they are not persisted, and a subscriber that
/// registers late does not see earlier saves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    aggregate_type: String,

    /// Position of the event in its aggregate stream (1-based).
    sequence_number: u64,

    envelope: EventEnvelope<JsonValue>,
}

impl Notification {
    pub fn new(
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        envelope: EventEnvelope<JsonValue>,
    ) -> Self {
        Self {
            aggregate_type: aggregate_type.into(),
            sequence_number,
            envelope,
        }
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.envelope.aggregate_id()
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn event_type(&self) -> &str {
        self.envelope.event_type()
    }

    pub fn envelope(&self) -> &EventEnvelope<JsonValue> {
        &self.envelope
    }

    /// Decode the payload into the event enum `E`.
    ///
    /// Fails if the payload does not deserialize, or if the decoded variant does not
    /// carry the tag the event was published under.
    pub fn decode<E>(&self) -> Result<EventEnvelope<E>, DecodeError>
    where
        E: Event + DeserializeOwned,
    {
        let expected = self.envelope.event_type().to_string();
        let envelope = self
            .envelope
            .clone()
            .try_map_payload(serde_json::from_value::<E>)
            .map_err(|e| DecodeError::Payload(e.to_string()))?;

        let found = envelope.payload().event_type();
        if found != expected {
            return Err(DecodeError::TagMismatch {
                expected,
                found: found.to_string(),
            });
        }
        Ok(envelope)
    }
}

/// Failure to turn a [`Notification`] back into a typed envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("failed to deserialize event payload: {0}")]
    Payload(String),

    #[error("event tag mismatch (published as '{expected}', payload is '{found}')")]
    TagMismatch { expected: String, found: String },
}
