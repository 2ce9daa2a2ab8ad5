//! Aggregate repository: the bridge between write side and read side.
//!
//! ## Save
//!
//! ```text
//! aggregate.pending
//!   ↓
//! 1. Serialize + append to the event store (durable step)
//!   ↓
//! 2. Notify every registered subscriber, per committed event, in order
//!   ↓
//! 3. Fold pending into history (history ++ pending), clear pending
//! ```
//!
//! If step 1 fails nothing is published and the aggregate keeps its pending
//! changes, so `save` can simply be retried. Once step 1 succeeds the events are
//! durable: step 3 always runs, whatever the subscribers do.
//!
//! ## Load
//!
//! Fetch the identity's stream, check it, decode it and hand it to
//! [`Aggregate::from_timeline`]. An identity with no events is not an error; it
//! yields an aggregate in its default state.
//!
//! ## Concurrency
//!
//! There is no version check on save. Two writers holding the same aggregate
//! both append; the store orders the batches one after the other (last writer
//! wins). Callers that need stronger guarantees must serialize commands per
//! identity themselves.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use seekyours_core::{AggregateId, AggregateRoot};
use seekyours_events::{
    Aggregate, Notification, QueueSubscriber, Subscriber, SubscriberError, SubscriberId,
    SubscriberRegistry, Subscription, Timeline,
};

use crate::config::{RepositoryConfig, SubscriberFailurePolicy};
use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Appending to or reading from the event store failed.
    #[error("event store failure: {0}")]
    Storage(#[from] EventStoreError),

    /// The store returned a stream that cannot belong to the requested aggregate.
    #[error("corrupt stream for aggregate {aggregate_id}: {reason}")]
    CorruptStream {
        aggregate_id: AggregateId,
        reason: String,
    },

    /// A subscriber failed under [`SubscriberFailurePolicy::FailFast`].
    ///
    /// The events were persisted and the aggregate's timeline was committed.
    #[error("{subscriber} failed on event {sequence_number} of aggregate {aggregate_id}: {source}")]
    Subscriber {
        subscriber: SubscriberId,
        aggregate_id: AggregateId,
        sequence_number: u64,
        #[source]
        source: SubscriberError,
    },
}

/// Persists aggregates' pending changes, publishes them, and rebuilds aggregates
/// from stored history.
///
/// One repository serves every aggregate kind; the subscriber list it owns sees
/// all of them (filter on [`Notification::aggregate_type`]).
#[derive(Debug)]
pub struct AggregateRepository<S> {
    store: S,
    subscribers: SubscriberRegistry,
    config: RepositoryConfig,
}

impl<S> AggregateRepository<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, RepositoryConfig::default())
    }

    pub fn with_config(store: S, config: RepositoryConfig) -> Self {
        Self {
            store,
            subscribers: SubscriberRegistry::new(),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Register a subscriber for every event committed from now on.
    pub fn subscribe(&self, subscriber: impl Subscriber + 'static) -> SubscriberId {
        self.subscribers.register(subscriber)
    }

    /// Register a closure subscriber.
    pub fn subscribe_fn<F>(&self, f: F) -> SubscriberId
    where
        F: Fn(&Notification) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        self.subscribers.register_fn(f)
    }

    /// Register a queued subscriber; notifications are buffered in a channel and
    /// consumed from the returned [`Subscription`] at the consumer's own pace.
    pub fn subscribe_queue(&self) -> (SubscriberId, Subscription<Notification>) {
        let (subscriber, subscription) = QueueSubscriber::channel();
        (self.subscribers.register(subscriber), subscription)
    }

    /// Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.subscribers.unregister(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<S> AggregateRepository<S>
where
    S: EventStore,
{
    /// Persist the aggregate's pending changes, notify subscribers, and commit the
    /// aggregate's timeline.
    ///
    /// Returns the stored records (with sequence numbers). Saving an aggregate
    /// without pending changes is a no-op.
    pub fn save<A>(&self, aggregate: &mut A) -> Result<Vec<StoredEvent>, RepositoryError>
    where
        A: Aggregate,
        A::Event: Serialize,
    {
        let pending = aggregate.timeline().pending();
        if pending.is_empty() {
            tracing::debug!(
                aggregate_type = A::AGGREGATE_TYPE,
                "save skipped: no pending changes"
            );
            return Ok(vec![]);
        }

        let aggregate_id = pending[0].aggregate_id();
        let expected = pending.len();

        // 1) Persist (pending stays untouched on failure)
        let uncommitted = pending
            .iter()
            .map(|envelope| UncommittedEvent::from_envelope(A::AGGREGATE_TYPE, envelope))
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted).map_err(|err| {
            tracing::error!(
                aggregate_type = A::AGGREGATE_TYPE,
                error = %err,
                "failed to append pending changes"
            );
            RepositoryError::from(err)
        })?;

        if committed.len() != expected {
            tracing::error!(
                aggregate_type = A::AGGREGATE_TYPE,
                aggregate_id = %aggregate_id,
                expected,
                returned = committed.len(),
                "store acknowledged a different number of events than appended"
            );
            return Err(EventStoreError::Backend(format!(
                "append returned {} records for {expected} events",
                committed.len()
            ))
            .into());
        }

        // 2) Notify, 3) commit; the commit happens even if a subscriber fails.
        let published = self.publish(&committed);
        aggregate.timeline_mut().commit();

        tracing::debug!(
            aggregate_type = A::AGGREGATE_TYPE,
            aggregate_id = %aggregate_id,
            events = committed.len(),
            version = aggregate.version(),
            "saved aggregate"
        );

        published?;
        Ok(committed)
    }

    /// Rebuild an aggregate from its stored history.
    ///
    /// An unknown identity yields a default-state aggregate.
    pub fn load<A>(&self, aggregate_id: AggregateId) -> Result<A, RepositoryError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let stored = self.store.events_for(aggregate_id)?;
        validate_loaded_stream(aggregate_id, A::AGGREGATE_TYPE, &stored)?;

        let history = stored
            .iter()
            .map(|e| e.to_envelope::<A::Event>())
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            aggregate_type = A::AGGREGATE_TYPE,
            aggregate_id = %aggregate_id,
            events = history.len(),
            "loaded aggregate"
        );

        Ok(A::from_timeline(Timeline::from_history(history)))
    }

    fn publish(&self, committed: &[StoredEvent]) -> Result<(), RepositoryError> {
        let subscribers = self.subscribers.snapshot();
        if subscribers.is_empty() {
            return Ok(());
        }

        for stored in committed {
            let notification = stored.to_notification();
            for (id, subscriber) in &subscribers {
                let Err(source) = subscriber.notify(&notification) else {
                    continue;
                };

                match self.config.subscriber_failure_policy {
                    SubscriberFailurePolicy::LogAndContinue => {
                        tracing::warn!(
                            subscriber = %id,
                            aggregate_id = %stored.aggregate_id,
                            sequence_number = stored.sequence_number,
                            event_type = %stored.event_type,
                            error = %source,
                            "subscriber failed; continuing"
                        );
                    }
                    SubscriberFailurePolicy::FailFast => {
                        return Err(RepositoryError::Subscriber {
                            subscriber: *id,
                            aggregate_id: stored.aggregate_id,
                            sequence_number: stored.sequence_number,
                            source,
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

fn validate_loaded_stream(
    aggregate_id: AggregateId,
    aggregate_type: &str,
    stream: &[StoredEvent],
) -> Result<(), RepositoryError> {
    // Guard against a backend returning someone else's events or a reordered stream.
    let corrupt = |reason: String| RepositoryError::CorruptStream {
        aggregate_id,
        reason,
    };

    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(corrupt(format!(
                "stream contains aggregate_id {} at index {idx}",
                e.aggregate_id
            )));
        }
        if e.aggregate_type != aggregate_type {
            return Err(corrupt(format!(
                "stream has aggregate_type '{}' at index {idx}, expected '{aggregate_type}'",
                e.aggregate_type
            )));
        }
        if e.sequence_number <= last {
            return Err(corrupt(format!(
                "non-monotonic sequence_number (last={last}, found={})",
                e.sequence_number
            )));
        }
        last = e.sequence_number;
    }
    Ok(())
}
