//! Event-sourced aggregates: state as a pure function of the event timeline.
//!
//! An aggregate never stores its fields. It owns a [`Timeline`] (committed
//! `history` followed by not-yet-saved `pending` changes), and every derived
//! field asks the timeline for the *last* event of the kind relevant to it:
//!
//! ```ignore
//! fn name(&self) -> Option<&str> {
//!     if self.contains::<CustomerRemoved>() {
//!         return None;
//!     }
//!     self.last_of::<CustomerChanged>()
//!         .map(|e| e.name.as_str())
//!         .or_else(|| self.last_of::<CustomerCreated>().map(|e| e.name.as_str()))
//! }
//! ```
//!
//! Each access re-scans the timeline. Timelines are expected to stay small, and
//! keeping every field's precedence rule local to the field matters more here
//! than the scan cost.

use seekyours_core::AggregateRoot;

use crate::envelope::EventEnvelope;
use crate::event::{Event, EventKind};

/// Ordered event timeline of one aggregate instance.
///
/// Invariant: `history` and `pending` are disjoint; [`Timeline::commit`] is the only
/// operation that moves envelopes from one to the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline<E> {
    history: Vec<EventEnvelope<E>>,
    pending: Vec<EventEnvelope<E>>,
}

impl<E> Default for Timeline<E> {
    fn default() -> Self {
        Self {
            history: Vec::new(),
            pending: Vec::new(),
        }
    }
}

impl<E> Timeline<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A loaded timeline: committed history, nothing pending.
    pub fn from_history(history: Vec<EventEnvelope<E>>) -> Self {
        Self {
            history,
            pending: Vec::new(),
        }
    }

    pub fn history(&self) -> &[EventEnvelope<E>] {
        &self.history
    }

    pub fn pending(&self) -> &[EventEnvelope<E>] {
        &self.pending
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// All envelopes, history first, in application order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &EventEnvelope<E>> {
        self.history.iter().chain(self.pending.iter())
    }

    pub fn len(&self) -> usize {
        self.history.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append an envelope to the pending changes.
    pub fn push(&mut self, envelope: EventEnvelope<E>) {
        self.pending.push(envelope);
    }

    /// Fold pending changes into history (`history ++ pending`) and clear pending.
    ///
    /// Called by the repository once the pending changes are durable.
    pub fn commit(&mut self) {
        self.history.append(&mut self.pending);
    }
}

impl<E: Event> Timeline<E> {
    /// Last payload of kind `T` across `history ++ pending`.
    pub fn last_of<T: EventKind<E>>(&self) -> Option<&T> {
        self.iter().rev().find_map(|envelope| envelope.downcast::<T>())
    }

    /// Whether any event of kind `T` exists anywhere in the timeline.
    pub fn contains<T: EventKind<E>>(&self) -> bool {
        self.iter().any(|envelope| envelope.is::<T>())
    }
}

/// Event-sourced aggregate abstraction.
///
/// Implementors hold a [`Timeline`] and expose derived, read-only state computed
/// from it, plus domain methods that validate their input and then call
/// [`Aggregate::apply_change`].
///
/// `apply_change` performs no validation: it does not check that the event's
/// identity matches the aggregate's. That is the domain method's job.
pub trait Aggregate: AggregateRoot + Sized {
    type Event: Event;

    /// Stable aggregate kind (e.g. "customers.customer"); recorded with every stored event.
    const AGGREGATE_TYPE: &'static str;

    /// Rebuild an aggregate over a timeline (used by the repository on load).
    fn from_timeline(timeline: Timeline<Self::Event>) -> Self;

    fn timeline(&self) -> &Timeline<Self::Event>;

    fn timeline_mut(&mut self) -> &mut Timeline<Self::Event>;

    /// Record a new pending change.
    fn apply_change<T: EventKind<Self::Event>>(&mut self, change: T) {
        let envelope = EventEnvelope::new(change.into_event());
        self.timeline_mut().push(envelope);
    }

    /// Last recorded payload of kind `T`, or `None` if no such event exists.
    fn last_of<T: EventKind<Self::Event>>(&self) -> Option<&T> {
        self.timeline().last_of::<T>()
    }

    /// Last recorded payload of kind `T`, or `T::default()` if none exists.
    fn last_of_or_default<T>(&self) -> T
    where
        T: EventKind<Self::Event> + Default + Clone,
    {
        self.last_of::<T>().cloned().unwrap_or_default()
    }

    fn contains<T: EventKind<Self::Event>>(&self) -> bool {
        self.timeline().contains::<T>()
    }

    fn has_pending_changes(&self) -> bool {
        self.timeline().has_pending()
    }
}
