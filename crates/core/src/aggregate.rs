//! Aggregate root contract for event-sourced domain models.

use crate::id::AggregateId;

/// Aggregate root marker + minimal interface.
///
/// Both values are *derived*: an event-sourced aggregate computes them from its
/// event timeline rather than storing them.
pub trait AggregateRoot {
    /// Returns the aggregate identifier.
    ///
    /// Returns [`AggregateId::EMPTY`] when the aggregate has not been created yet
    /// or has been removed.
    fn id(&self) -> AggregateId;

    /// Number of events in the aggregate's timeline (committed + pending).
    fn version(&self) -> u64;

    /// Whether the aggregate currently has a live identity.
    fn exists(&self) -> bool {
        !self.id().is_empty()
    }
}
