//! Change-notification subscribers (read-side hooks).
//!
//! A [`SubscriberRegistry`] is an explicit, owned list of callbacks. It is meant to
//! live inside the component that publishes (the aggregate repository); there is no
//! process-global hook.
//!
//! Delivery is synchronous: whoever calls [`SubscriberRegistry::snapshot`] and invokes
//! the subscribers does so on its own thread, in registration order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use crate::notification::Notification;

/// Failure reported by a subscriber while handling a notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SubscriberError(String);

impl SubscriberError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Receives every committed event published by a repository.
///
/// Any `Fn(&Notification) -> Result<(), SubscriberError> + Send + Sync` closure is a
/// subscriber.
pub trait Subscriber: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), SubscriberError>;
}

impl<F> Subscriber for F
where
    F: Fn(&Notification) -> Result<(), SubscriberError> + Send + Sync,
{
    fn notify(&self, notification: &Notification) -> Result<(), SubscriberError> {
        self(notification)
    }
}

/// Handle returned on registration; pass it back to unregister.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl core::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "subscriber-{}", self.0)
    }
}

type Entry = (SubscriberId, Arc<dyn Subscriber>);

/// Ordered list of registered subscribers.
#[derive(Default)]
pub struct SubscriberRegistry {
    next_id: AtomicU64,
    entries: RwLock<Vec<Entry>>,
}

impl core::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.len())
            .finish()
    }
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, subscriber: impl Subscriber + 'static) -> SubscriberId {
        self.register_arc(Arc::new(subscriber))
    }

    /// Register a closure; its signature is inferred from the bound.
    pub fn register_fn<F>(&self, f: F) -> SubscriberId
    where
        F: Fn(&Notification) -> Result<(), SubscriberError> + Send + Sync + 'static,
    {
        self.register_arc(Arc::new(f))
    }

    pub fn register_arc(&self, subscriber: Arc<dyn Subscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write_entries().push((id, subscriber));
        id
    }

    /// Remove a subscriber. Returns `false` if the id was not registered.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let mut entries = self.write_entries();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current subscribers, in registration order.
    ///
    /// Callers invoke the returned subscribers without holding the registry lock, so
    /// a subscriber may (un)register others from inside its callback.
    pub fn snapshot(&self) -> Vec<(SubscriberId, Arc<dyn Subscriber>)> {
        self.read_entries().clone()
    }

    // Every mutation is a single push or retain, so a panic elsewhere cannot leave
    // the list half-updated; a poisoned lock is recovered.
    fn read_entries(&self) -> RwLockReadGuard<'_, Vec<Entry>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, Vec<Entry>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
